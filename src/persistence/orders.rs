//! Order persistence: insert, conditional update, lookups, expiry sweep.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{ExpiryCutoff, StoreError};
use crate::types::order::{Delivery, Order, OrderStatus};

const ORDER_COLUMNS: &str = "id, gateway_order_id, user_id, guest_email, guest_name, listing_id, \
     amount, currency, status, payment_status, payment_url, created_at, expires_at, paid_at, \
     delivered_at, delivery_details, delivery_notes, delivered_by";

#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub gateway_order_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub guest_email: Option<String>,
    pub guest_name: Option<String>,
    pub listing_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub payment_status: Option<String>,
    pub payment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivery_details: Option<String>,
    pub delivery_notes: Option<String>,
    pub delivered_by: Option<Uuid>,
}

/// Convert a row into an `Order`. The delivery columns must be all set or all null.
pub fn order_row_to_order(row: OrderRow) -> Result<Order, StoreError> {
    let status = row
        .status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::Corrupt(format!("order {}: {}", row.id, e)))?;
    let delivery = match (row.delivery_details, row.delivered_by, row.delivered_at) {
        (Some(details), Some(delivered_by), Some(delivered_at)) => Some(Delivery {
            details,
            notes: row.delivery_notes,
            delivered_by,
            delivered_at,
        }),
        (None, None, None) => None,
        _ => {
            return Err(StoreError::Corrupt(format!(
                "order {}: partial delivery payload",
                row.id
            )));
        }
    };
    Ok(Order {
        id: row.id,
        gateway_order_id: row.gateway_order_id,
        user_id: row.user_id,
        guest_email: row.guest_email,
        guest_name: row.guest_name,
        listing_id: row.listing_id,
        amount: row.amount,
        currency: row.currency,
        status,
        payment_status: row.payment_status,
        payment_url: row.payment_url,
        created_at: row.created_at,
        expires_at: row.expires_at,
        paid_at: row.paid_at,
        delivery,
    })
}

pub async fn insert_order(pool: &PgPool, order: &Order) -> Result<(), StoreError> {
    let delivery = order.delivery.as_ref();
    sqlx::query(
        "INSERT INTO orders (id, gateway_order_id, user_id, guest_email, guest_name, listing_id, \
         amount, currency, status, payment_status, payment_url, created_at, expires_at, paid_at, \
         delivered_at, delivery_details, delivery_notes, delivered_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
    )
    .bind(order.id)
    .bind(&order.gateway_order_id)
    .bind(order.user_id)
    .bind(&order.guest_email)
    .bind(&order.guest_name)
    .bind(order.listing_id)
    .bind(order.amount)
    .bind(&order.currency)
    .bind(order.status.as_str())
    .bind(&order.payment_status)
    .bind(&order.payment_url)
    .bind(order.created_at)
    .bind(order.expires_at)
    .bind(order.paid_at)
    .bind(delivery.map(|d| d.delivered_at))
    .bind(delivery.map(|d| d.details.as_str()))
    .bind(delivery.and_then(|d| d.notes.as_deref()))
    .bind(delivery.map(|d| d.delivered_by))
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Duplicate(format!("order {}", order.id))
        }
        other => StoreError::Database(other),
    })?;
    Ok(())
}

pub async fn get_order_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Order>, StoreError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {} FROM orders WHERE id = $1",
        ORDER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(order_row_to_order).transpose()
}

pub async fn get_order_by_gateway_id(
    pool: &PgPool,
    gateway_order_id: &str,
) -> Result<Option<Order>, StoreError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {} FROM orders WHERE gateway_order_id = $1",
        ORDER_COLUMNS
    ))
    .bind(gateway_order_id)
    .fetch_optional(pool)
    .await?;
    row.map(order_row_to_order).transpose()
}

/// Write the mutable order fields, guarded by the status the caller observed.
pub async fn update_order_if_status(
    pool: &PgPool,
    order: &Order,
    expected: OrderStatus,
) -> Result<bool, StoreError> {
    let delivery = order.delivery.as_ref();
    let result = sqlx::query(
        "UPDATE orders SET status = $1, payment_status = $2, paid_at = $3, delivered_at = $4, \
         delivery_details = $5, delivery_notes = $6, delivered_by = $7 \
         WHERE id = $8 AND status = $9",
    )
    .bind(order.status.as_str())
    .bind(&order.payment_status)
    .bind(order.paid_at)
    .bind(delivery.map(|d| d.delivered_at))
    .bind(delivery.map(|d| d.details.as_str()))
    .bind(delivery.and_then(|d| d.notes.as_deref()))
    .bind(delivery.map(|d| d.delivered_by))
    .bind(order.id)
    .bind(expected.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn record_payment_status(
    pool: &PgPool,
    id: Uuid,
    payment_status: &str,
) -> Result<bool, StoreError> {
    let result =
        sqlx::query("UPDATE orders SET payment_status = $1 WHERE id = $2 AND status = 'pending'")
            .bind(payment_status)
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn expire_stale_guest_orders(
    pool: &PgPool,
    cutoff: ExpiryCutoff,
) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'expired', payment_status = 'expired' \
         WHERE user_id IS NULL AND status = 'pending' \
         AND ((expires_at IS NOT NULL AND expires_at < $1) \
              OR (expires_at IS NULL AND created_at < $2))",
    )
    .bind(cutoff.now)
    .bind(cutoff.created_before)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
