use channel_market::api::auth::seed_admin;
use channel_market::api::routes::{AppState, app_router};
use channel_market::config::AppConfig;
use channel_market::lifecycle::{OrderService, spawn_sweeper};
use channel_market::notify::{HttpMailer, LogMailer, Mailer, Notifier};
use channel_market::payment::{HttpPaymentGateway, PaymentGateway};
use channel_market::persistence::{PgStore, create_pool_and_migrate};
use channel_market::store::{MemoryStore, Store};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(create_pool_and_migrate(url).await?)),
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        seed_admin(store.as_ref(), username, password, &config.admin_email).await?;
    }

    let mailer: Arc<dyn Mailer> = match &config.mail_api_url {
        Some(url) => Arc::new(HttpMailer::new(url, &config.mail_api_key, &config.mail_from)?),
        None => Arc::new(LogMailer),
    };
    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        HttpPaymentGateway::new(&config.payment_gateway_url, &config.payment_gateway_api_key)?,
    );
    let notifier = Notifier::new(mailer, &config.app_base_url, &config.admin_email);
    let orders = Arc::new(OrderService::new(store, gateway, notifier, config.clone()));

    if !config.sweep_interval.is_zero() {
        spawn_sweeper(orders.clone(), config.sweep_interval);
    }

    let app = app_router(AppState::new(orders));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
