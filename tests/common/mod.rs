//! Shared fixtures: in-memory service, fake gateway, recording mailer, HTTP spawn.

#![allow(dead_code)]

use async_trait::async_trait;
use channel_market::api::routes::{AppState, app_router};
use channel_market::config::AppConfig;
use channel_market::error::UpstreamError;
use channel_market::lifecycle::OrderService;
use channel_market::notify::{Email, Mailer, Notifier, NotifyError};
use channel_market::payment::{GatewayStatus, Invoice, InvoiceRequest, PaymentGateway};
use channel_market::store::{ListingStore, MemoryStore, OrderStore, Store};
use channel_market::types::listing::{Listing, ListingStatus};
use channel_market::types::order::{Buyer, Order};
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
pub struct FakeGateway {
    status: Mutex<Option<GatewayStatus>>,
    fail_status: AtomicBool,
    fail_invoice: AtomicBool,
    invoices: AtomicUsize,
    status_queries: AtomicUsize,
}

impl FakeGateway {
    pub fn set_status(&self, is_final: bool, payment_status: &str) {
        *self.status.lock().unwrap() = Some(GatewayStatus {
            is_final,
            payment_status: Some(payment_status.to_string()),
            status: None,
        });
    }

    pub fn fail_status_queries(&self) {
        self.fail_status.store(true, Ordering::SeqCst);
    }

    pub fn fail_invoices(&self) {
        self.fail_invoice.store(true, Ordering::SeqCst);
    }

    pub fn invoices_created(&self) -> usize {
        self.invoices.load(Ordering::SeqCst)
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, UpstreamError> {
        if self.fail_invoice.load(Ordering::SeqCst) {
            return Err(UpstreamError::Gateway("invoice service down".to_string()));
        }
        self.invoices.fetch_add(1, Ordering::SeqCst);
        Ok(Invoice {
            order_id: format!("gw-{}", request.reference),
            payment_url: Some(format!("https://pay.example/{}", request.reference)),
        })
    }

    async fn order_status(&self, _gateway_order_id: &str) -> Result<GatewayStatus, UpstreamError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(UpstreamError::Gateway("connection refused".to_string()));
        }
        self.status
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| UpstreamError::Gateway("no status configured".to_string()))
    }
}

/// Keeps every message it was asked to send; can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent_to(&self, to: &str) -> Vec<Email> {
        self.sent().into_iter().filter(|e| e.to == to).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("smtp unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct Harness {
    pub service: Arc<OrderService>,
    pub store: MemoryStore,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<RecordingMailer>,
    pub config: Arc<AppConfig>,
}

pub fn harness() -> Harness {
    harness_with(AppConfig::for_tests())
}

pub fn harness_with(config: AppConfig) -> Harness {
    let config = Arc::new(config);
    let store = MemoryStore::new();
    let gateway = Arc::new(FakeGateway::default());
    let mailer = Arc::new(RecordingMailer::default());
    let notifier = Notifier::new(mailer.clone(), &config.app_base_url, &config.admin_email);
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let service = Arc::new(OrderService::new(
        shared,
        gateway.clone(),
        notifier,
        config.clone(),
    ));
    Harness {
        service,
        store,
        gateway,
        mailer,
        config,
    }
}

pub async fn seed_listing(store: &MemoryStore) -> Listing {
    let listing = Listing {
        id: Uuid::new_v4(),
        title: "Retro gaming channel, 120k subscribers".to_string(),
        price_usd_cents: 250_000,
        status: ListingStatus::Available,
    };
    store.insert_listing(&listing).await.unwrap();
    listing
}

fn with_gateway_id(mut order: Order) -> Order {
    order.gateway_order_id = Some(format!("gw-{}", order.id));
    order
}

pub fn guest_order(listing_id: Uuid, email: &str) -> Order {
    with_gateway_id(Order::new_pending(
        Buyer::Guest {
            email: email.to_string(),
            name: Some("Guest Buyer".to_string()),
        },
        listing_id,
        4_000_000,
        "IDR",
        Utc::now(),
    ))
}

pub fn owned_order(listing_id: Uuid, user_id: Uuid) -> Order {
    with_gateway_id(Order::new_pending(
        Buyer::User(user_id),
        listing_id,
        4_000_000,
        "IDR",
        Utc::now(),
    ))
}

/// Guest order created `age` ago with no explicit expiry.
pub fn aged_guest_order(listing_id: Uuid, email: &str, age: Duration) -> Order {
    let mut order = guest_order(listing_id, email);
    order.created_at = Utc::now() - age;
    order.expires_at = None;
    order
}

pub async fn insert(store: &MemoryStore, order: &Order) {
    store.insert_order(order).await.unwrap();
}

pub async fn reload(store: &MemoryStore, id: Uuid) -> Order {
    store.get_order(id).await.unwrap().unwrap()
}

/// Spawn app on a random port and return (base_url, guard that keeps server running).
pub async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}
