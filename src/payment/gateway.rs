//! Outbound calls to the payment gateway: invoice creation and status polling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

use crate::error::UpstreamError;

/// Invoice request sent when a buyer checks out.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRequest {
    pub reference: Uuid,
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub customer_email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    #[serde(alias = "orderId")]
    pub order_id: String,
    #[serde(alias = "paymentUrl")]
    pub payment_url: Option<String>,
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayStatus {
    #[serde(alias = "isFinal")]
    pub is_final: bool,
    #[serde(alias = "paymentStatus", default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl GatewayStatus {
    /// Status value used for reconciliation, preferring `payment_status`.
    pub fn reported(&self) -> Option<&str> {
        self.payment_status.as_deref().or(self.status.as_deref())
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, UpstreamError>;

    async fn order_status(&self, gateway_order_id: &str) -> Result<GatewayStatus, UpstreamError>;
}

/// HTTP client for the gateway's JSON API.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(
        skip(self, request),
        fields(reference = %request.reference, amount = request.amount)
    )]
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, UpstreamError> {
        let response = self
            .client
            .post(format!("{}/invoices", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Invoice>().await?)
    }

    #[instrument(skip(self))]
    async fn order_status(&self, gateway_order_id: &str) -> Result<GatewayStatus, UpstreamError> {
        let response = self
            .client
            .get(format!("{}/orders/{}", self.base_url, gateway_order_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<GatewayStatus>().await?)
    }
}
