//! Who may look at an order.
//!
//! The caller's capability is resolved once per request into a [`Caller`];
//! [`check_access`] then evaluates the rules in a fixed order and denies by
//! default. Admins are one of the variants, so no call site can forget the
//! admin bypass.

use uuid::Uuid;

use crate::error::AppError;
use crate::types::order::Order;
use crate::types::user::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Admin { user_id: Uuid },
    /// Signed-in customer. May also supply an email (e.g. the `?email=` query).
    User { user_id: Uuid, email: Option<String> },
    Guest { email: String },
    Anonymous,
}

impl Caller {
    /// Build the capability from an optional authenticated identity and an optional email.
    pub fn resolve(identity: Option<(Uuid, Role)>, email: Option<&str>) -> Self {
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        match (identity, email) {
            (Some((user_id, Role::Admin)), _) => Caller::Admin { user_id },
            (Some((user_id, Role::Customer)), email) => Caller::User { user_id, email },
            (None, Some(email)) => Caller::Guest { email },
            (None, None) => Caller::Anonymous,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Caller::Admin { user_id } | Caller::User { user_id, .. } => Some(*user_id),
            Caller::Guest { .. } | Caller::Anonymous => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Caller::User { email, .. } => email.as_deref(),
            Caller::Guest { email } => Some(email),
            Caller::Admin { .. } | Caller::Anonymous => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotFound,
    EmailVerificationRequired,
    Unauthorized,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::NotFound => "not found",
            DenyReason::EmailVerificationRequired => "email verification required",
            DenyReason::Unauthorized => "unauthorized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied(DenyReason),
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allowed)
    }

    pub fn reason(self) -> Option<&'static str> {
        match self {
            Access::Allowed => None,
            Access::Denied(reason) => Some(reason.as_str()),
        }
    }

    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Access::Allowed => Ok(()),
            Access::Denied(DenyReason::NotFound) => Err(AppError::not_found("order")),
            Access::Denied(reason) => Err(AppError::Unauthorized(reason.as_str().to_string())),
        }
    }
}

/// Read-only access decision for `order` (None when the lookup found nothing).
pub fn check_access(order: Option<&Order>, caller: &Caller) -> Access {
    let Some(order) = order else {
        return Access::Denied(DenyReason::NotFound);
    };
    if caller.is_admin() {
        return Access::Allowed;
    }
    if let (Some(owner), Some(user_id)) = (order.user_id, caller.user_id()) {
        if owner == user_id {
            return Access::Allowed;
        }
    }
    if order.user_id.is_none() {
        if let Some(guest_email) = order.guest_email.as_deref() {
            return match caller.email() {
                Some(email) if email.trim().eq_ignore_ascii_case(guest_email.trim()) => {
                    Access::Allowed
                }
                _ => Access::Denied(DenyReason::EmailVerificationRequired),
            };
        }
    }
    Access::Denied(DenyReason::Unauthorized)
}
