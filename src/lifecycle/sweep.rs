//! Expiry sweep for abandoned guest checkouts.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::OrderService;
use crate::error::Result;
use crate::store::{ExpiryCutoff, OrderStore};
use crate::types::order::INVOICE_LIFETIME_MINUTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired_count: u64,
}

impl OrderService {
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        self.sweep_expired_at(Utc::now()).await
    }

    /// Expire pending guest orders whose invoice lapsed before `now`. Orders
    /// without an explicit expiry fall back to the invoice lifetime.
    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let cutoff = ExpiryCutoff {
            now,
            created_before: now - Duration::minutes(INVOICE_LIFETIME_MINUTES),
        };
        let expired_count = self.store.expire_stale_guest_orders(cutoff).await?;
        if expired_count > 0 {
            info!(expired_count, "expired stale guest orders");
        }
        Ok(SweepReport { expired_count })
    }
}

/// Run the sweep every `every` until the runtime shuts down.
pub fn spawn_sweeper(service: Arc<OrderService>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = service.sweep_expired().await {
                error!(error = %e, "expiry sweep failed");
            }
        }
    })
}
