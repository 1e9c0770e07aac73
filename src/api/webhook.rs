use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{Value, json};

use crate::api::routes::AppState;
use crate::error::AppError;
use crate::payment::SIGNATURE_HEADER;

/// Gateway callback. The raw body is handed over untouched for signature checking.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let outcome = state.orders.handle_webhook(&body, signature).await?;
    Ok(Json(json!({
        "received": true,
        "order_id": outcome.order.id,
        "status": outcome.order.status,
        "transitioned": outcome.transitioned_to.is_some(),
    })))
}
