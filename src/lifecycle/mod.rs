//! Order lifecycle: checkout, access policy, payment reconciliation,
//! expiry sweep, delivery and completion.
//!
//! `OrderService` is what request handlers call into. Admin-only operations
//! are authorised by the caller before they reach this layer.

pub mod access;
pub mod checkout;
pub mod delivery;
pub mod reconcile;
pub mod sweep;

use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

pub use access::{Access, Caller, DenyReason, check_access};
pub use checkout::CheckoutRequest;
pub use delivery::DeliveryInput;
pub use reconcile::{ReconcileOutcome, ReconcileSource};
pub use sweep::{SweepReport, spawn_sweeper};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::notify::Notifier;
use crate::payment::PaymentGateway;
use crate::store::{OrderStore, Store, UserStore};
use crate::types::order::Order;

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Notifier,
    config: Arc<AppConfig>,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Notifier,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Fetch an order the caller is allowed to see.
    pub async fn get_order(&self, order_id: Uuid, caller: &Caller) -> Result<Order> {
        let order = self.store.get_order(order_id).await?;
        check_access(order.as_ref(), caller).into_result()?;
        order.ok_or_else(|| AppError::not_found("order"))
    }

    /// Account email for owned orders, captured email for guest orders.
    async fn customer_email(&self, order: &Order) -> Option<String> {
        if let Some(email) = &order.guest_email {
            return Some(email.clone());
        }
        let user_id = order.user_id?;
        match self.store.get_user(user_id).await {
            Ok(user) => user.map(|u| u.email),
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "could not load customer email");
                None
            }
        }
    }
}
