//! Admin back-office actions. Every handler requires an admin bearer token.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::auth::AdminUser;
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::lifecycle::{DeliveryInput, SweepReport};
use crate::types::order::Order;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverRequest {
    #[serde(default)]
    pub delivery_details: String,
    #[serde(default)]
    pub delivery_notes: Option<String>,
}

pub async fn deliver(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<DeliverRequest>,
) -> Result<Json<Order>, AppError> {
    let input = DeliveryInput::new(body.delivery_details, body.delivery_notes);
    let order = state.orders.deliver(id, input, admin.user_id).await?;
    Ok(Json(order))
}

pub async fn complete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders.complete(id).await?;
    info!(order_id = %id, admin = %admin.user_id, "completion recorded by admin");
    Ok(Json(order))
}

pub async fn sweep(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<SweepReport>, AppError> {
    let report = state.orders.sweep_expired().await?;
    info!(admin = %admin.user_id, expired_count = report.expired_count, "manual sweep");
    Ok(Json(report))
}
