//! Transactional email bodies.

use reqwest::Url;

use crate::types::order::Order;

use super::mailer::Email;

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Tracking link; guest orders carry the buyer's email as a URL-encoded `?email=`.
fn order_link(base_url: &str, order: &Order) -> String {
    let path = format!("{}/orders/{}", base_url.trim_end_matches('/'), order.id);
    let link = match &order.guest_email {
        Some(email) => Url::parse_with_params(&path, &[("email", email)])
            .map(String::from)
            .unwrap_or(path),
        None => path,
    };
    escape(&link)
}

fn amount(order: &Order) -> String {
    format!("{} {}", order.currency, order.amount)
}

pub fn order_received(to: &str, order: &Order, base_url: &str) -> Email {
    let pay = order
        .payment_url
        .as_deref()
        .map(|url| {
            format!(
                "<p><a href=\"{}\">Complete your payment</a> within one hour.</p>",
                escape(url)
            )
        })
        .unwrap_or_default();
    Email {
        to: to.to_string(),
        subject: format!("Order {} received", order.id),
        html_body: format!(
            "<p>We received your order for {}.</p>{}<p>Track it at {}</p>",
            amount(order),
            pay,
            order_link(base_url, order)
        ),
    }
}

pub fn order_confirmed(to: &str, order: &Order, base_url: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Order {} confirmed", order.id),
        html_body: format!(
            "<p>Your order is confirmed. Our team is preparing the channel transfer.</p>\
             <p>Track it at {}</p>",
            order_link(base_url, order)
        ),
    }
}

pub fn payment_confirmed(to: &str, order: &Order) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Payment received for order {}", order.id),
        html_body: format!("<p>We received your payment of {}.</p>", amount(order)),
    }
}

pub fn order_delivered(to: &str, order: &Order, base_url: &str) -> Email {
    let (details, notes) = order
        .delivery
        .as_ref()
        .map(|d| (escape(&d.details), d.notes.as_deref().map(escape)))
        .unwrap_or_default();
    let notes = notes
        .map(|n| format!("<p>Notes: {}</p>", n))
        .unwrap_or_default();
    Email {
        to: to.to_string(),
        subject: format!("Order {} delivered", order.id),
        html_body: format!(
            "<p>Your channel is ready.</p><pre>{}</pre>{}<p>Details are also available at {}</p>",
            details,
            notes,
            order_link(base_url, order)
        ),
    }
}

pub fn order_completed(to: &str, order: &Order) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Order {} completed", order.id),
        html_body: "<p>Your order is complete. Thank you for buying with us.</p>".to_string(),
    }
}

pub fn admin_order_paid(to: &str, order: &Order, whatsapp: Option<&str>) -> Email {
    let buyer = order
        .guest_email
        .clone()
        .or_else(|| order.user_id.map(|id| format!("user {}", id)))
        .unwrap_or_default();
    let chat = whatsapp
        .map(|link| format!("<p><a href=\"{}\">Open WhatsApp</a></p>", escape(link)))
        .unwrap_or_default();
    Email {
        to: to.to_string(),
        subject: format!("[admin] Order {} paid", order.id),
        html_body: format!(
            "<p>Order {} for listing {} was paid ({}) by {}.</p>{}",
            order.id,
            order.listing_id,
            amount(order),
            escape(&buyer),
            chat
        ),
    }
}
