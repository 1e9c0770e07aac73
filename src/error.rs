//! Application error taxonomy and its JSON rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Failures talking to, or hearing from, the payment gateway.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("payment gateway request failed: {0}")]
    Gateway(String),

    #[error("payment is not final yet (gateway status '{0}')")]
    NotFinal(String),
}

impl UpstreamError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, UpstreamError::InvalidSignature)
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Gateway(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{} not found", what))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(UpstreamError::InvalidSignature) => StatusCode::UNAUTHORIZED,
            AppError::Upstream(UpstreamError::Gateway(_)) => StatusCode::BAD_GATEWAY,
            AppError::Upstream(UpstreamError::NotFinal(_)) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "storage failure");
                json!({ "error": "database operation failed" })
            }
            AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "internal failure");
                json!({ "error": "internal error" })
            }
            AppError::Upstream(e) if e.is_retryable() => {
                json!({ "error": self.to_string(), "retryable": true })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
