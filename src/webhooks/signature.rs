//! Webhook signature verification.
//!
//! The provider sends `<provider>-signature: t=<unix millis>, v1=<hex>`,
//! where `v1` is HMAC-SHA256 over `"<t>.<raw body>"` keyed with the shared
//! secret. The raw bytes are verified before anything reads the payload.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing")]
    MissingHeader,

    #[error("signature header is malformed")]
    Malformed,

    #[error("signature timestamp is outside the tolerance window")]
    Expired,

    #[error("signature does not match payload")]
    Mismatch,
}

/// Parsed `t=..., v1=...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp_ms: i64,
    pub signature: Vec<u8>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signature = None;

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.trim().parse::<i64>().ok(),
                Some(("v1", value)) => signature = hex::decode(value.trim()).ok(),
                _ => {}
            }
        }

        match (timestamp, signature) {
            (Some(timestamp_ms), Some(signature)) => Ok(Self {
                timestamp_ms,
                signature,
            }),
            _ => Err(SignatureError::Malformed),
        }
    }
}

/// Verify `body` against the signature header.
///
/// `now_ms` is injected so callers and tests control the clock.
pub fn verify(
    secret: &str,
    body: &[u8],
    header: Option<&str>,
    now_ms: i64,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    let header = header
        .filter(|h| !h.trim().is_empty())
        .ok_or(SignatureError::MissingHeader)?;
    let parsed = SignatureHeader::parse(header)?;

    let tolerance_ms = u64::try_from(tolerance.as_millis()).unwrap_or(u64::MAX);
    if now_ms.abs_diff(parsed.timestamp_ms) > tolerance_ms {
        return Err(SignatureError::Expired);
    }

    mac_for(secret, parsed.timestamp_ms, body)?
        .verify_slice(&parsed.signature)
        .map_err(|_| SignatureError::Mismatch)
}

/// Produce a signature header value for `body` at `timestamp_ms`.
pub fn sign(secret: &str, body: &[u8], timestamp_ms: i64) -> String {
    let signature = match mac_for(secret, timestamp_ms, body) {
        Ok(mac) => hex::encode(mac.finalize().into_bytes()),
        Err(_) => String::new(),
    };
    format!("t={timestamp_ms}, v1={signature}")
}

fn mac_for(secret: &str, timestamp_ms: i64, body: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp_ms.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}
