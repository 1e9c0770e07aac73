//! Database layer: pool, migrations, and access for orders, listings, users, settings.

mod listings;
mod orders;
mod pool;
mod settings;
mod users;

use async_trait::async_trait;
use uuid::Uuid;

pub use pool::create_pool_and_migrate;
pub use sqlx::PgPool;

use crate::store::{ExpiryCutoff, ListingStore, OrderStore, SettingStore, StoreError, UserStore};
use crate::types::listing::{Listing, ListingStatus};
use crate::types::order::{Order, OrderStatus};
use crate::types::user::User;

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        orders::insert_order(&self.pool, order).await
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        orders::get_order_by_id(&self.pool, id).await
    }

    async fn get_order_by_gateway_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        orders::get_order_by_gateway_id(&self.pool, gateway_order_id).await
    }

    async fn update_order_if_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, StoreError> {
        orders::update_order_if_status(&self.pool, order, expected).await
    }

    async fn record_payment_status(
        &self,
        id: Uuid,
        payment_status: &str,
    ) -> Result<bool, StoreError> {
        orders::record_payment_status(&self.pool, id, payment_status).await
    }

    async fn expire_stale_guest_orders(&self, cutoff: ExpiryCutoff) -> Result<u64, StoreError> {
        orders::expire_stale_guest_orders(&self.pool, cutoff).await
    }
}

#[async_trait]
impl ListingStore for PgStore {
    async fn insert_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        listings::insert_listing(&self.pool, listing).await
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        listings::get_listing_by_id(&self.pool, id).await
    }

    async fn set_listing_status(&self, id: Uuid, status: ListingStatus) -> Result<(), StoreError> {
        listings::update_listing_status(&self.pool, id, status).await
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        users::insert_user(&self.pool, user).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        users::get_user_by_id(&self.pool, id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        users::get_user_by_username(&self.pool, username).await
    }
}

#[async_trait]
impl SettingStore for PgStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        settings::get_setting(&self.pool, key).await
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        settings::put_setting(&self.pool, key, value).await
    }
}
