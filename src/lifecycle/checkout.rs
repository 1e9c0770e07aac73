//! Order creation: price the listing, open a gateway invoice, store a pending order.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{Caller, OrderService};
use crate::error::{AppError, Result};
use crate::payment::InvoiceRequest;
use crate::store::{ListingStore, OrderStore};
use crate::types::listing::ListingStatus;
use crate::types::order::{Buyer, Order};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub listing_id: Uuid,
    #[serde(default)]
    pub guest_email: Option<String>,
    #[serde(default)]
    pub guest_name: Option<String>,
}

/// Loose shape check: something@domain.tld, no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// USD cents to whole units of the local currency, rounded to nearest.
pub fn convert_usd_cents(cents: i64, rate: f64) -> i64 {
    (cents as f64 * rate / 100.0).round() as i64
}

fn buyer_for(caller: &Caller, request: &CheckoutRequest) -> Result<Buyer> {
    if let Some(user_id) = caller.user_id() {
        return Ok(Buyer::User(user_id));
    }
    let email = request
        .guest_email
        .as_deref()
        .or(caller.email())
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Validation("guest email is required".to_string()))?;
    if !is_plausible_email(email) {
        return Err(AppError::Validation("guest email is invalid".to_string()));
    }
    let name = request
        .guest_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    Ok(Buyer::Guest {
        email: email.to_lowercase(),
        name,
    })
}

impl OrderService {
    pub async fn create_order(&self, caller: &Caller, request: CheckoutRequest) -> Result<Order> {
        let listing = self
            .store
            .get_listing(request.listing_id)
            .await?
            .ok_or_else(|| AppError::not_found("listing"))?;
        if listing.status != ListingStatus::Available {
            return Err(AppError::InvalidState("listing is not available".to_string()));
        }
        let buyer = buyer_for(caller, &request)?;

        let rate = self.config.exchange_rate(&*self.store).await?;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(AppError::Config(format!("exchange rate {} is not usable", rate)));
        }
        let amount = convert_usd_cents(listing.price_usd_cents, rate);

        let mut order = Order::new_pending(
            buyer,
            listing.id,
            amount,
            &self.config.currency,
            Utc::now(),
        );
        let invoice = self
            .gateway
            .create_invoice(&InvoiceRequest {
                reference: order.id,
                amount: order.amount,
                currency: order.currency.clone(),
                description: listing.title.clone(),
                customer_email: order.guest_email.clone(),
                expires_at: order.expires_at,
            })
            .await?;
        order.gateway_order_id = Some(invoice.order_id);
        order.payment_url = invoice.payment_url;

        self.store.insert_order(&order).await?;
        info!(
            order_id = %order.id,
            listing_id = %listing.id,
            amount = order.amount,
            guest = order.is_guest(),
            "order created"
        );

        let to = self.customer_email(&order).await;
        self.notifier.order_received(&order, to.as_deref()).await;
        Ok(order)
    }
}
