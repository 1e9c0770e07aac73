//! Admin-side fulfilment: attach transfer details to a paid order, then close it.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::OrderService;
use crate::error::{AppError, Result};
use crate::store::OrderStore;
use crate::types::order::{Delivery, Order, OrderStatus};

pub const MAX_DETAILS_LEN: usize = 5_000;
pub const MAX_NOTES_LEN: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryInput {
    pub details: String,
    pub notes: Option<String>,
}

impl DeliveryInput {
    pub fn new(details: impl Into<String>, notes: Option<String>) -> Self {
        Self {
            details: details.into(),
            notes,
        }
    }

    /// Trimmed details and notes; empty notes collapse to `None`.
    pub fn validate(self) -> Result<(String, Option<String>)> {
        let details = self.details.trim().to_string();
        if details.is_empty() {
            return Err(AppError::Validation("delivery details are required".to_string()));
        }
        if details.chars().count() > MAX_DETAILS_LEN {
            return Err(AppError::Validation(format!(
                "delivery details exceed {} characters",
                MAX_DETAILS_LEN
            )));
        }
        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            return Err(AppError::Validation(format!(
                "delivery notes exceed {} characters",
                MAX_NOTES_LEN
            )));
        }
        Ok((details, notes))
    }
}

impl OrderService {
    /// Move a paid order to `delivered`. State is checked before the payload.
    pub async fn deliver(
        &self,
        order_id: Uuid,
        input: DeliveryInput,
        actor: Uuid,
    ) -> Result<Order> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("order"))?;
        if order.status.is_delivered_or_later() {
            return Err(AppError::InvalidState("order already delivered".to_string()));
        }
        if !order.status.can_transition_to(OrderStatus::Delivered) {
            return Err(AppError::InvalidState(
                "order must be paid before delivery".to_string(),
            ));
        }
        let (details, notes) = input.validate()?;

        let mut delivered = order.clone();
        delivered.status = OrderStatus::Delivered;
        delivered.delivery = Some(Delivery {
            details,
            notes,
            delivered_by: actor,
            delivered_at: Utc::now(),
        });
        if !self
            .store
            .update_order_if_status(&delivered, OrderStatus::Paid)
            .await?
        {
            return Err(AppError::InvalidState(
                "order changed while delivering; reload and retry".to_string(),
            ));
        }
        info!(order_id = %delivered.id, actor = %actor, "order delivered");

        let to = self.customer_email(&delivered).await;
        self.notifier
            .order_delivered(&delivered, to.as_deref())
            .await;
        Ok(delivered)
    }

    /// Close a delivered order. The delivery payload is kept.
    pub async fn complete(&self, order_id: Uuid) -> Result<Order> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("order"))?;
        if order.status == OrderStatus::Completed {
            return Err(AppError::InvalidState("order already completed".to_string()));
        }
        if !order.status.can_transition_to(OrderStatus::Completed) {
            return Err(AppError::InvalidState(
                "order must be delivered before completion".to_string(),
            ));
        }
        let mut completed = order.clone();
        completed.status = OrderStatus::Completed;
        if !self
            .store
            .update_order_if_status(&completed, OrderStatus::Delivered)
            .await?
        {
            return Err(AppError::InvalidState(
                "order changed while completing; reload and retry".to_string(),
            ));
        }
        info!(order_id = %completed.id, "order completed");

        let to = self.customer_email(&completed).await;
        self.notifier
            .order_completed(&completed, to.as_deref())
            .await;
        Ok(completed)
    }
}
