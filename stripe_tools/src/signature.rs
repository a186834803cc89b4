//! Webhook signature verification.
//!
//! Stripe signs every webhook delivery with a shared secret. The signature header has the form
//! `t=<unix timestamp>,v1=<hex hmac-sha256>`, where the MAC is computed over `"{timestamp}.{raw body}"`.
//! Verification must happen on the raw request bytes, before any JSON parsing, and must reject stale
//! timestamps so that a captured delivery cannot be replayed later.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Deliveries older than this are rejected even when the MAC is valid.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("The signature header is malformed: {0}")]
    MalformedHeader(String),
    #[error("The signature timestamp is outside the allowed tolerance")]
    StaleTimestamp,
    #[error("The signature does not match the payload")]
    Mismatch,
}

/// Computes the hex signature for a payload at the given timestamp.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Builds a complete signature header for a payload, timestamped now. Used by tests and local tooling.
pub fn signature_header(secret: &str, payload: &[u8]) -> String {
    let timestamp = Utc::now().timestamp();
    format!("t={timestamp},v1={}", sign(secret, timestamp, payload))
}

/// Verifies a signature header against the raw payload bytes.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut provided = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => provided = Some(value),
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader("missing timestamp".into()))?;
    let provided = provided.ok_or_else(|| SignatureError::MalformedHeader("missing v1 signature".into()))?;
    if (Utc::now().timestamp() - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::StaleTimestamp);
    }
    let provided = hex::decode(provided).map_err(|_| SignatureError::Mismatch)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.verify_slice(&provided).map_err(|_| SignatureError::Mismatch)
}
