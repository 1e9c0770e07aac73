//! Customer and admin notifications.
//!
//! Every send here is best-effort: failures are logged and dropped so they can
//! never change the outcome of the state change that triggered them.

mod mailer;
pub mod templates;
mod whatsapp;

use std::sync::Arc;
use tracing::{info, warn};

pub use mailer::{Email, HttpMailer, LogMailer, Mailer, NotifyError};
pub use whatsapp::whatsapp_link;

use crate::types::order::Order;

#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    base_url: String,
    admin_email: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, base_url: &str, admin_email: &str) -> Self {
        Self {
            mailer,
            base_url: base_url.to_string(),
            admin_email: admin_email.to_string(),
        }
    }

    async fn deliver(&self, order: &Order, email: Email) {
        match self.mailer.send(&email).await {
            Ok(()) => info!(order_id = %order.id, subject = %email.subject, "notification sent"),
            Err(e) => warn!(
                order_id = %order.id,
                subject = %email.subject,
                error = %e,
                "notification failed; state change stands"
            ),
        }
    }

    fn recipient<'a>(&self, order: &Order, to: Option<&'a str>) -> Option<&'a str> {
        if to.is_none() {
            warn!(order_id = %order.id, "no customer email on file; skipping notification");
        }
        to
    }

    pub async fn order_received(&self, order: &Order, to: Option<&str>) {
        if let Some(to) = self.recipient(order, to) {
            let email = templates::order_received(to, order, &self.base_url);
            self.deliver(order, email).await;
        }
    }

    /// Customer confirmation plus payment receipt, then the admin alert.
    pub async fn order_paid(&self, order: &Order, to: Option<&str>, admin_whatsapp: &str) {
        if let Some(to) = self.recipient(order, to) {
            self.deliver(order, templates::order_confirmed(to, order, &self.base_url))
                .await;
            self.deliver(order, templates::payment_confirmed(to, order))
                .await;
        }
        let link = whatsapp_link(
            admin_whatsapp,
            &format!("Order {} has been paid and awaits delivery.", order.id),
        );
        let email = templates::admin_order_paid(&self.admin_email, order, link.as_deref());
        self.deliver(order, email).await;
    }

    pub async fn order_delivered(&self, order: &Order, to: Option<&str>) {
        if let Some(to) = self.recipient(order, to) {
            let email = templates::order_delivered(to, order, &self.base_url);
            self.deliver(order, email).await;
        }
    }

    pub async fn order_completed(&self, order: &Order, to: Option<&str>) {
        if let Some(to) = self.recipient(order, to) {
            self.deliver(order, templates::order_completed(to, order))
                .await;
        }
    }
}
