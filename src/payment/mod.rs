//! Payment gateway integration.

pub mod gateway;
pub mod webhook;

pub use gateway::{GatewayStatus, HttpPaymentGateway, Invoice, InvoiceRequest, PaymentGateway};
pub use webhook::{SIGNATURE_HEADER, WebhookPayload, authenticate, sign, verify_signature};
