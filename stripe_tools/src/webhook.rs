//! Verification of the signatures Stripe attaches to webhook deliveries.
//!
//! Stripe signs the raw request body with the endpoint's signing secret and sends the result in
//! the `Stripe-Signature` header as `t=<unix ts>,v1=<hex hmac>[,v1=...]`. The signed payload is
//! `"{timestamp}.{body}"`, and the timestamp must fall inside a tolerance window so that a
//! captured delivery cannot be replayed later.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::data_objects::PaymentIntent;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// The envelope of a webhook delivery. Only the fields the gateway dispatches on are modeled.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: PaymentIntent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No timestamp in signature header")]
    MissingTimestamp,
    #[error("No v1 signature in signature header")]
    MissingSignature,
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),
    #[error("Signature timestamp is outside the tolerance window ({0}s old)")]
    StaleTimestamp(i64),
    #[error("Signature does not match payload")]
    Mismatch,
}

/// Computes the hex signature for the given timestamp and payload. Exposed so that tests (and the
/// deterministic test gateway) can produce deliveries the verifier accepts.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a `Stripe-Signature` header against the raw request body.
///
/// `now` is the current unix time; it is a parameter rather than a clock read so the replay
/// window is testable.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or_else(|| SignatureError::MalformedHeader(part.trim().to_string()))?;
        match key {
            "t" => {
                let ts = value
                    .parse::<i64>()
                    .map_err(|_| SignatureError::MalformedHeader(format!("bad timestamp: {value}")))?;
                timestamp = Some(ts);
            },
            "v1" => candidates.push(value),
            // Stripe also sends v0 signatures for endpoints migrated from earlier schemes
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if candidates.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    let age = now - timestamp;
    if age.abs() > tolerance_secs {
        return Err(SignatureError::StaleTimestamp(age));
    }
    // Candidate comparison goes through Mac::verify_slice for constant-time behaviour
    let verified = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .ok()
            .map(|sig| {
                let mut mac =
                    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
                mac.update(timestamp.to_string().as_bytes());
                mac.update(b".");
                mac.update(payload);
                mac.verify_slice(&sig).is_ok()
            })
            .unwrap_or(false)
    });
    if verified {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
