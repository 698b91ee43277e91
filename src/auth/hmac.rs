//! HMAC-SHA256 body signing and verification.

use ring::hmac;

use crate::config::Secret;
use crate::error::{AuthErrorKind, GateError};

/// Verifies `HMAC-SHA256(secret, body)` signatures over raw request bodies.
///
/// The body must be the exact bytes received on the wire; a re-serialized
/// copy is not guaranteed to be byte-identical.
pub struct SignatureVerifier {
    key: hmac::Key,
}

impl SignatureVerifier {
    /// Create a new verifier keyed by the shared secret.
    pub fn new(secret: &Secret) -> Result<Self, GateError> {
        Self::from_bytes(secret.expose())
    }

    /// Create a verifier from raw key bytes. Empty keys are a configuration error.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, GateError> {
        if secret.is_empty() {
            return Err(GateError::Config {
                message: "HMAC secret must not be empty".to_string(),
            });
        }

        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        })
    }

    /// Verify a hex-encoded signature against the raw body.
    ///
    /// The tag comparison is constant-time (`ring::hmac::verify`).
    pub fn verify(&self, body: &[u8], claimed_signature: &str) -> Result<(), AuthErrorKind> {
        let signature_bytes = decode_signature(claimed_signature)?;

        hmac::verify(&self.key, body, &signature_bytes).map_err(|_| AuthErrorKind::SignatureMismatch)
    }

    /// Sign a body, returning the lowercase hex tag.
    pub fn sign(&self, body: &[u8]) -> String {
        let tag = hmac::sign(&self.key, body);
        hex::encode(tag.as_ref())
    }
}

/// Decode a hex signature, tolerating a `sha256=` prefix.
fn decode_signature(claimed: &str) -> Result<Vec<u8>, AuthErrorKind> {
    let trimmed = claimed.trim();
    let hex_part = trimmed.strip_prefix("sha256=").unwrap_or(trimmed);
    if hex_part.is_empty() {
        return Err(AuthErrorKind::SignatureMismatch);
    }
    hex::decode(hex_part).map_err(|_| AuthErrorKind::SignatureMismatch)
}
