//! Storage seam for orders, listings, users and settings.
//!
//! `MemoryStore` backs tests and database-less runs; `persistence::PgStore`
//! is the Postgres implementation. Both honour the same contract: every
//! status transition is a conditional single-row write, and the expiry sweep
//! is one batch write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::types::listing::{Listing, ListingStatus};
use crate::types::order::{Order, OrderStatus};
use crate::types::user::User;

mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("duplicate {0}")]
    Duplicate(String),
}

/// Filter of the expiry sweep: guest orders still `pending` whose invoice ran out.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryCutoff {
    /// Orders with an explicit `expires_at` earlier than this are stale.
    pub now: DateTime<Utc>,
    /// Orders without `expires_at` created before this are stale.
    pub created_before: DateTime<Utc>,
}

impl ExpiryCutoff {
    pub fn matches(&self, order: &Order) -> bool {
        if !order.is_guest() || order.status != OrderStatus::Pending {
            return false;
        }
        match order.expires_at {
            Some(expires_at) => expires_at < self.now,
            None => order.created_at < self.created_before,
        }
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn get_order_by_gateway_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, StoreError>;

    /// Persist `order` only if the stored status still equals `expected`.
    /// Returns whether the write happened.
    async fn update_order_if_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, StoreError>;

    /// Record the gateway's raw payment status on a still-`pending` order.
    /// Returns false when the order is missing or already settled.
    async fn record_payment_status(
        &self,
        id: Uuid,
        payment_status: &str,
    ) -> Result<bool, StoreError>;

    /// Mark every order matching `cutoff` as expired in one batch.
    async fn expire_stale_guest_orders(&self, cutoff: ExpiryCutoff) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert_listing(&self, listing: &Listing) -> Result<(), StoreError>;

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;

    async fn set_listing_status(&self, id: Uuid, status: ListingStatus) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the username is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait SettingStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Everything the service needs from its backing store.
pub trait Store: OrderStore + ListingStore + UserStore + SettingStore {}

impl<T> Store for T where T: OrderStore + ListingStore + UserStore + SettingStore {}
