//! Webhook Signature Verification
//!
//! PagerDuty signs every v3 delivery with HMAC-SHA256 over the raw body.
//! The `X-PagerDuty-Signature` header lists one `v1=<hex>` entry per active
//! signing secret, separated by commas.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::error::PagerDutyError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signatures
pub const SIGNATURE_HEADER: &str = "X-PagerDuty-Signature";

/// Prefix of a version 1 signature entry
const VERSION_PREFIX: &str = "v1=";

fn keyed_mac(secret: &str, body: &[u8]) -> Result<HmacSha256, PagerDutyError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PagerDutyError::MalformedSignature(e.to_string()))?;
    mac.update(body);
    Ok(mac)
}

/// Verify a delivery against the shared signing secret
///
/// Passes when any `v1=` entry of the header matches the body.
pub fn verify_signature(
    body: &[u8],
    header: Option<&str>,
    secret: &str,
) -> Result<(), PagerDutyError> {
    let header = header.ok_or(PagerDutyError::MissingSignature(SIGNATURE_HEADER))?;

    let candidates: Vec<&str> = header
        .split(',')
        .filter_map(|entry| entry.trim().strip_prefix(VERSION_PREFIX))
        .collect();

    if candidates.is_empty() {
        return Err(PagerDutyError::MalformedSignature(header.to_string()));
    }

    let mac = keyed_mac(secret, body)?;
    for candidate in candidates {
        let Ok(expected) = hex::decode(candidate) else {
            debug!("Skipping signature entry that is not hex");
            continue;
        };
        // verify_slice compares in constant time
        if mac.clone().verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(PagerDutyError::InvalidSignature)
}

/// Produce the header value PagerDuty would send for `body`
pub fn sign(body: &[u8], secret: &str) -> Result<String, PagerDutyError> {
    let digest = keyed_mac(secret, body)?.finalize().into_bytes();
    Ok(format!("{VERSION_PREFIX}{}", hex::encode(digest)))
}
