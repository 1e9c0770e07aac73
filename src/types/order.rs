use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type OrderId = Uuid;

/// Invoice lifetime promised by the payment gateway.
pub const INVOICE_LIFETIME_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Delivered,
    Completed,
    Expired,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Expired => "expired",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// True once payment has been received (paid or any later stage).
    pub fn is_paid_or_later(self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Delivered | OrderStatus::Completed
        )
    }

    pub fn is_delivered_or_later(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Completed)
    }

    /// Edges of the order workflow graph. Everything else is rejected.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Expired)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::Delivered)
                | (OrderStatus::Delivered, OrderStatus::Completed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown order status '{}'", self.0)
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "delivered" => Ok(OrderStatus::Delivered),
            "completed" => Ok(OrderStatus::Completed),
            "expired" => Ok(OrderStatus::Expired),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Transfer details attached by an admin once the order is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub details: String,
    pub notes: Option<String>,
    pub delivered_by: Uuid,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub gateway_order_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub guest_email: Option<String>,
    pub guest_name: Option<String>,
    pub listing_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: Option<String>,
    pub payment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivery: Option<Delivery>,
}

/// Who is buying: an account holder or a guest identified by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Buyer {
    User(Uuid),
    Guest { email: String, name: Option<String> },
}

impl Order {
    /// A fresh `pending` order. Exactly one of owner / guest email is set.
    pub fn new_pending(
        buyer: Buyer,
        listing_id: Uuid,
        amount: i64,
        currency: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let (user_id, guest_email, guest_name) = match buyer {
            Buyer::User(id) => (Some(id), None, None),
            Buyer::Guest { email, name } => (None, Some(email), name),
        };
        Self {
            id: Uuid::new_v4(),
            gateway_order_id: None,
            user_id,
            guest_email,
            guest_name,
            listing_id,
            amount,
            currency: currency.to_string(),
            status: OrderStatus::Pending,
            payment_status: None,
            payment_url: None,
            created_at: now,
            expires_at: Some(now + Duration::minutes(INVOICE_LIFETIME_MINUTES)),
            paid_at: None,
            delivery: None,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_edges() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Completed));

        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Expired.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Delivered));
    }
}
