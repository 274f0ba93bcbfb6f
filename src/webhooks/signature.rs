//! Svix-style webhook signatures as used by Clerk.
//!
//! The signed content is `{svix-id}.{svix-timestamp}.{body}`, keyed with the
//! base64 part of the `whsec_` secret. `svix-signature` carries one or more
//! space-separated `v1,<base64>` entries; any match accepts the delivery.

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const TOLERANCE_SECS: u64 = 5 * 60;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("missing required header {0}")]
    MissingHeader(&'static str),
    #[error("invalid timestamp header")]
    InvalidTimestamp,
    #[error("timestamp outside tolerance")]
    TimestampOutOfTolerance,
    #[error("no matching signature")]
    NoMatchingSignature,
    #[error("invalid signing secret: {0}")]
    InvalidSecret(String),
}

#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = BASE64
            .decode(encoded)
            .map_err(|e| WebhookError::InvalidSecret(e.to_string()))?;
        if key.is_empty() {
            return Err(WebhookError::InvalidSecret("empty key".into()));
        }
        Ok(Self { key })
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(headers, body, OffsetDateTime::now_utc().unix_timestamp())
    }

    pub fn verify_at(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let id = header(headers, HEADER_ID)?;
        let timestamp = header(headers, HEADER_TIMESTAMP)?;
        let signatures = header(headers, HEADER_SIGNATURE)?;

        let ts = timestamp
            .parse::<i64>()
            .map_err(|_| WebhookError::InvalidTimestamp)?;
        if now.abs_diff(ts) > TOLERANCE_SECS {
            return Err(WebhookError::TimestampOutOfTolerance);
        }

        let expected = self.sign(id, timestamp, body);
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .any(|(_, sig)| bool::from(sig.as_bytes().ct_eq(expected.as_bytes())));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::NoMatchingSignature)
        }
    }

    /// Base64 HMAC-SHA256 over the signed content, without the `v1,` prefix.
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> String {
        // HMAC accepts keys of any length
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .expect("HMAC can take key of any size");
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(WebhookError::MissingHeader(name))
}
