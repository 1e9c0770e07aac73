//! Customer-facing order endpoints: checkout, lookup, payment check.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth::MaybeAuth;
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::lifecycle::{Caller, CheckoutRequest, ReconcileOutcome};
use crate::types::order::{Order, OrderStatus};

/// `?email=` lets a guest prove they placed the order.
#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

fn caller(auth: MaybeAuth, email: Option<&str>) -> Caller {
    Caller::resolve(auth.0.map(|u| (u.user_id, u.role)), email)
}

#[derive(Debug, Serialize)]
pub struct PaymentCheckResponse {
    pub order: Order,
    pub transitioned_to: Option<OrderStatus>,
}

impl From<ReconcileOutcome> for PaymentCheckResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        Self {
            order: outcome.order,
            transitioned_to: outcome.transitioned_to,
        }
    }
}

pub async fn create_order(
    State(state): State<AppState>,
    auth: MaybeAuth,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let caller = caller(auth, None);
    let order = state.orders.create_order(&caller, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    auth: MaybeAuth,
    Path(id): Path<Uuid>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Order>, AppError> {
    let caller = caller(auth, query.email.as_deref());
    Ok(Json(state.orders.get_order(id, &caller).await?))
}

pub async fn check_payment(
    State(state): State<AppState>,
    auth: MaybeAuth,
    Path(id): Path<Uuid>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<PaymentCheckResponse>, AppError> {
    let caller = caller(auth, query.email.as_deref());
    let outcome = state.orders.check_payment(id, &caller).await?;
    Ok(Json(outcome.into()))
}
