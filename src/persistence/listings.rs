//! Listing persistence. The order workflow only reads listings and flips them to sold.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::store::StoreError;
use crate::types::listing::{Listing, ListingStatus};

#[derive(Debug, FromRow)]
pub struct ListingRow {
    pub id: Uuid,
    pub title: String,
    pub price_usd_cents: i64,
    pub status: String,
}

pub async fn insert_listing(pool: &PgPool, listing: &Listing) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO listings (id, title, price_usd_cents, status) VALUES ($1, $2, $3, $4)")
        .bind(listing.id)
        .bind(&listing.title)
        .bind(listing.price_usd_cents)
        .bind(listing.status.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_listing_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Listing>, StoreError> {
    let row = sqlx::query_as::<_, ListingRow>(
        "SELECT id, title, price_usd_cents, status FROM listings WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(listing_row_to_listing).transpose()
}

fn listing_row_to_listing(row: ListingRow) -> Result<Listing, StoreError> {
    let status = row
        .status
        .parse::<ListingStatus>()
        .map_err(StoreError::Corrupt)?;
    Ok(Listing {
        id: row.id,
        title: row.title,
        price_usd_cents: row.price_usd_cents,
        status,
    })
}

pub async fn update_listing_status(
    pool: &PgPool,
    id: Uuid,
    status: ListingStatus,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE listings SET status = $1 WHERE id = $2")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
