//! In-process store. Each operation holds one write guard, which gives the
//! same atomicity the Postgres store gets from single statements.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ExpiryCutoff, ListingStore, OrderStore, SettingStore, StoreError, UserStore};
use crate::types::listing::{Listing, ListingStatus};
use crate::types::order::{Order, OrderStatus};
use crate::types::user::User;

#[derive(Default)]
struct Tables {
    orders: HashMap<Uuid, Order>,
    listings: HashMap<Uuid, Listing>,
    users: HashMap<Uuid, User>,
    settings: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if guard.orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate(format!("order {}", order.id)));
        }
        if let Some(gid) = &order.gateway_order_id {
            let taken = guard
                .orders
                .values()
                .any(|o| o.gateway_order_id.as_deref() == Some(gid.as_str()));
            if taken {
                return Err(StoreError::Duplicate(format!("gateway order id {}", gid)));
            }
        }
        guard.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn get_order_by_gateway_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .orders
            .values()
            .find(|o| o.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn update_order_if_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, StoreError> {
        let mut guard = self.inner.write().await;
        match guard.orders.get_mut(&order.id) {
            Some(stored) if stored.status == expected => {
                *stored = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_payment_status(
        &self,
        id: Uuid,
        payment_status: &str,
    ) -> Result<bool, StoreError> {
        let mut guard = self.inner.write().await;
        match guard.orders.get_mut(&id) {
            Some(stored) if stored.status == OrderStatus::Pending => {
                stored.payment_status = Some(payment_status.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_stale_guest_orders(&self, cutoff: ExpiryCutoff) -> Result<u64, StoreError> {
        let mut guard = self.inner.write().await;
        let mut count = 0;
        for order in guard.orders.values_mut().filter(|o| cutoff.matches(o)) {
            order.status = OrderStatus::Expired;
            order.payment_status = Some("expired".to_string());
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn insert_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .listings
            .insert(listing.id, listing.clone());
        Ok(())
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        Ok(self.inner.read().await.listings.get(&id).cloned())
    }

    async fn set_listing_status(&self, id: Uuid, status: ListingStatus) -> Result<(), StoreError> {
        if let Some(listing) = self.inner.write().await.listings.get_mut(&id) {
            listing.status = status;
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if guard.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }
        guard.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.users.values().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl SettingStore for MemoryStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().await.settings.get(key).cloned())
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
