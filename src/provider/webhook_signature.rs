//! Processor webhook signature scheme.
//!
//! Header format: `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`, where each
//! `v1` is `HMAC-SHA256(webhook_secret, "{t}." || raw_body)`. Several `v1`
//! entries appear while the processor rolls a secret; any match verifies.

use async_trait::async_trait;
use ring::hmac;

use crate::config::Secret;
use crate::error::GateError;

use super::traits::{ProviderError, WebhookEvent, WebhookVerifier};

/// Verifies `t=...,v1=...` signature headers.
pub struct SignedHeaderVerifier {
    key: hmac::Key,
}

struct ParsedHeader<'a> {
    timestamp: &'a str,
    signatures: Vec<Vec<u8>>,
}

impl SignedHeaderVerifier {
    /// Create a verifier from the webhook signing secret.
    pub fn new(secret: &Secret) -> Result<Self, GateError> {
        Self::from_bytes(secret.expose())
    }

    /// Create a verifier from raw key bytes.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, GateError> {
        if secret.is_empty() {
            return Err(GateError::Config {
                message: "webhook secret must not be empty".to_string(),
            });
        }
        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        })
    }

    /// Produce a header for `raw_body` at `timestamp` (for clients and tests).
    pub fn signature_header(&self, raw_body: &[u8], timestamp: i64) -> String {
        let t = timestamp.to_string();
        let tag = hmac::sign(&self.key, &signed_payload(&t, raw_body));
        format!("t={},v1={}", t, hex::encode(tag.as_ref()))
    }

    fn verify_signature(&self, raw_body: &[u8], header: &str) -> Result<(), ProviderError> {
        let parsed = parse_header(header).ok_or(ProviderError::InvalidSignature)?;
        let payload = signed_payload(parsed.timestamp, raw_body);

        // Each candidate is compared in constant time.
        let matched = parsed
            .signatures
            .iter()
            .any(|sig| hmac::verify(&self.key, &payload, sig).is_ok());

        if matched {
            Ok(())
        } else {
            Err(ProviderError::InvalidSignature)
        }
    }
}

#[async_trait]
impl WebhookVerifier for SignedHeaderVerifier {
    async fn verify(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, ProviderError> {
        self.verify_signature(raw_body, signature_header)?;
        serde_json::from_slice(raw_body).map_err(|e| ProviderError::MalformedEvent(e.to_string()))
    }
}

fn signed_payload(timestamp: &str, raw_body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(timestamp.len() + 1 + raw_body.len());
    payload.extend_from_slice(timestamp.as_bytes());
    payload.push(b'.');
    payload.extend_from_slice(raw_body);
    payload
}

fn parse_header(header: &str) -> Option<ParsedHeader<'_>> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for item in header.split(',') {
        let (name, value) = item.trim().split_once('=')?;
        match name {
            "t" => timestamp = Some(value),
            "v1" => signatures.push(hex::decode(value).ok()?),
            // v0 and future schemes are ignored.
            _ => {}
        }
    }

    let timestamp = timestamp.filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))?;
    if signatures.is_empty() {
        return None;
    }

    Some(ParsedHeader {
        timestamp,
        signatures,
    })
}
