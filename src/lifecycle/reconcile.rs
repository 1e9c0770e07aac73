//! Payment status reconciliation, from the signed webhook or a manual poll.
//!
//! Only `pending` orders move. The write is conditional on the order still
//! being `pending`, so when a webhook and a poll race, exactly one of them
//! performs the transition and fires the notifications.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{Caller, OrderService, check_access};
use crate::config::DEFAULT_ADMIN_WHATSAPP;
use crate::error::{AppError, Result, UpstreamError};
use crate::payment::webhook;
use crate::store::{ListingStore, OrderStore};
use crate::types::listing::ListingStatus;
use crate::types::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileSource {
    Webhook,
    Poll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub order: Order,
    /// New status when this call moved the order, `None` for a no-op.
    pub transitioned_to: Option<OrderStatus>,
}

/// Internal status a gateway value maps to, if any.
pub fn target_status(reported: &str) -> Option<OrderStatus> {
    match reported.trim().to_ascii_lowercase().as_str() {
        "paid" => Some(OrderStatus::Paid),
        "expired" => Some(OrderStatus::Expired),
        "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
        _ => None,
    }
}

/// The order after applying `reported`, or `None` when nothing moves.
pub fn plan_transition(order: &Order, reported: &str, now: DateTime<Utc>) -> Option<Order> {
    let next = target_status(reported)?;
    if !order.status.can_transition_to(next) {
        return None;
    }
    let mut updated = order.clone();
    updated.status = next;
    updated.payment_status = Some(reported.to_string());
    if next == OrderStatus::Paid && updated.paid_at.is_none() {
        updated.paid_at = Some(now);
    }
    Some(updated)
}

impl OrderService {
    /// Apply a gateway-reported status to `order` and run the side effects of a transition.
    pub async fn reconcile(
        &self,
        order: Order,
        reported: &str,
        source: ReconcileSource,
    ) -> Result<ReconcileOutcome> {
        let Some(next) = plan_transition(&order, reported, Utc::now()) else {
            return self.record_without_transition(order, reported).await;
        };

        if !self
            .store
            .update_order_if_status(&next, OrderStatus::Pending)
            .await?
        {
            info!(order_id = %order.id, "order moved concurrently; skipping transition");
            let current = self
                .store
                .get_order(order.id)
                .await?
                .ok_or_else(|| AppError::not_found("order"))?;
            return Ok(ReconcileOutcome {
                order: current,
                transitioned_to: None,
            });
        }
        info!(
            order_id = %next.id,
            from = %order.status,
            to = %next.status,
            payment_status = reported,
            source = ?source,
            "order reconciled"
        );

        if next.status == OrderStatus::Paid {
            if source == ReconcileSource::Webhook {
                self.mark_listing_sold(&next).await;
            }
            let to = self.customer_email(&next).await;
            let whatsapp = match self.config.admin_whatsapp(&*self.store).await {
                Ok(number) => number,
                Err(e) => {
                    warn!(order_id = %next.id, error = %e, "admin whatsapp setting unreadable");
                    DEFAULT_ADMIN_WHATSAPP.to_string()
                }
            };
            self.notifier
                .order_paid(&next, to.as_deref(), &whatsapp)
                .await;
        }

        Ok(ReconcileOutcome {
            transitioned_to: Some(next.status),
            order: next,
        })
    }

    async fn record_without_transition(
        &self,
        mut order: Order,
        reported: &str,
    ) -> Result<ReconcileOutcome> {
        let recorded = order.status == OrderStatus::Pending
            && self.store.record_payment_status(order.id, reported).await?;
        if !recorded {
            info!(
                order_id = %order.id,
                payment_status = reported,
                "order already settled; ignoring report"
            );
            let current = self
                .store
                .get_order(order.id)
                .await?
                .ok_or_else(|| AppError::not_found("order"))?;
            return Ok(ReconcileOutcome {
                order: current,
                transitioned_to: None,
            });
        }
        info!(
            order_id = %order.id,
            payment_status = reported,
            "payment status recorded, order still pending"
        );
        order.payment_status = Some(reported.to_string());
        Ok(ReconcileOutcome {
            order,
            transitioned_to: None,
        })
    }

    async fn mark_listing_sold(&self, order: &Order) {
        match self
            .store
            .set_listing_status(order.listing_id, ListingStatus::Sold)
            .await
        {
            Ok(()) => info!(
                order_id = %order.id,
                listing_id = %order.listing_id,
                "listing marked sold"
            ),
            Err(e) => error!(
                order_id = %order.id,
                listing_id = %order.listing_id,
                error = %e,
                "failed to mark listing sold"
            ),
        }
    }

    /// Signed webhook entry point. The signature is checked before the body is parsed.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<ReconcileOutcome> {
        let payload = match webhook::authenticate(&self.config.webhook_secret, body, signature) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "webhook rejected");
                return Err(e);
            }
        };
        let reported = payload
            .reported()
            .ok_or_else(|| AppError::Validation("webhook carries no payment status".to_string()))?
            .to_string();
        let order = self
            .store
            .get_order_by_gateway_id(&payload.order_id)
            .await?
            .ok_or_else(|| AppError::not_found("order"))?;
        self.reconcile(order, &reported, ReconcileSource::Webhook)
            .await
    }

    /// Manual "check payment": ask the gateway, reconcile only on a final answer.
    pub async fn check_payment(&self, order_id: Uuid, caller: &Caller) -> Result<ReconcileOutcome> {
        let order = self.store.get_order(order_id).await?;
        check_access(order.as_ref(), caller).into_result()?;
        let order = order.ok_or_else(|| AppError::not_found("order"))?;

        let gateway_order_id = order
            .gateway_order_id
            .clone()
            .ok_or_else(|| AppError::InvalidState("order has no payment reference".to_string()))?;
        let status = match self.gateway.order_status(&gateway_order_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "payment status query failed");
                return Err(e.into());
            }
        };
        let reported = status.reported().unwrap_or("unknown").to_string();
        if !status.is_final {
            return Err(UpstreamError::NotFinal(reported).into());
        }
        self.reconcile(order, &reported, ReconcileSource::Poll).await
    }
}
