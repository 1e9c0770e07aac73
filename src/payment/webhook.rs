//! Inbound payment webhook: HMAC-SHA256 signature over the raw body.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{AppError, UpstreamError};

pub const SIGNATURE_HEADER: &str = "x-signature";

type HmacSha256 = Hmac<Sha256>;

/// Body the gateway posts on every payment status change.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub order_id: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl WebhookPayload {
    pub fn reported(&self) -> Option<&str> {
        self.payment_status.as_deref().or(self.status.as_deref())
    }
}

/// Hex signature the gateway would send for `body`.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, UpstreamError> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| UpstreamError::InvalidSignature)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature against the raw body.
pub fn verify_signature(
    secret: &[u8],
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), UpstreamError> {
    let provided = signature
        .map(str::trim)
        .and_then(|s| hex::decode(s).ok())
        .ok_or(UpstreamError::InvalidSignature)?;
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| UpstreamError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| UpstreamError::InvalidSignature)
}

/// Verify first, then parse. Nothing is decoded from an unauthenticated body.
pub fn authenticate(
    secret: &[u8],
    body: &[u8],
    signature: Option<&str>,
) -> Result<WebhookPayload, AppError> {
    verify_signature(secret, body, signature)?;
    serde_json::from_slice::<WebhookPayload>(body)
        .map_err(|e| AppError::Validation(format!("malformed webhook body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"shared-secret";

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"order_id":"gw-1","payment_status":"paid","status":"completed"}"#;
        let sig = sign(SECRET, body).unwrap();
        let payload = authenticate(SECRET, body, Some(&sig)).unwrap();
        assert_eq!(payload.order_id, "gw-1");
        assert_eq!(payload.reported(), Some("paid"));
    }

    #[test]
    fn rejects_tampered_body() {
        let body = br#"{"order_id":"gw-1","payment_status":"paid"}"#;
        let sig = sign(SECRET, body).unwrap();
        let tampered = br#"{"order_id":"gw-2","payment_status":"paid"}"#;
        assert!(matches!(
            verify_signature(SECRET, tampered, Some(&sig)),
            Err(UpstreamError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_missing_or_non_hex_signature() {
        let body = b"{}";
        assert!(verify_signature(SECRET, body, None).is_err());
        assert!(verify_signature(SECRET, body, Some("not-hex")).is_err());
    }

    #[test]
    fn invalid_signature_skips_parsing() {
        let err = authenticate(SECRET, b"not json at all", Some("00")).unwrap_err();
        assert!(matches!(err, AppError::Upstream(UpstreamError::InvalidSignature)));
    }
}
