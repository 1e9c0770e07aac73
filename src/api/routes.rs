use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::api::{admin, auth, orders, webhook};
use crate::lifecycle::OrderService;
use crate::store::Store;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub store: Arc<dyn Store>,
    pub jwt_secret: Vec<u8>,
}

impl AppState {
    pub fn new(orders: Arc<OrderService>) -> Self {
        let store = orders.store().clone();
        let jwt_secret = orders.config().jwt_secret.clone();
        Self {
            orders,
            store,
            jwt_secret,
        }
    }
}

async fn health() -> &'static str {
    "healthy"
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/orders", post(orders::create_order))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/check-payment", post(orders::check_payment))
        .route("/webhooks/payment", post(webhook::payment_webhook))
        .route("/admin/orders/sweep", post(admin::sweep))
        .route("/admin/orders/{id}/deliver", post(admin::deliver))
        .route("/admin/orders/{id}/complete", post(admin::complete))
        .with_state(state)
}
