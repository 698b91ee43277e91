//! Idempotency key validation.
//!
//! Keys are opaque client tokens, but they end up as map keys, log fields
//! and an outbound header, so their shape is bounded.

use crate::error::{GateError, IdempotencyErrorKind};

/// Maximum length of an idempotency key in bytes.
const MAX_KEY_LENGTH: usize = 255;

/// Validate an idempotency key header value.
///
/// Rules:
/// - Must be present and non-empty (after trimming whitespace)
/// - Must not exceed 255 bytes
/// - May only contain visible ASCII (`!` through `~`)
///
/// # Returns
///
/// The trimmed key if valid.
///
/// # Errors
///
/// `MissingKey` when absent or blank, `InvalidKey` otherwise.
pub fn validate_idempotency_key(raw: Option<&str>) -> Result<&str, GateError> {
    let key = raw.map(str::trim).unwrap_or_default();

    if key.is_empty() {
        return Err(IdempotencyErrorKind::MissingKey.into());
    }

    if key.len() > MAX_KEY_LENGTH {
        return Err(IdempotencyErrorKind::InvalidKey {
            message: format!(
                "Idempotency key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ),
        }
        .into());
    }

    if let Some(c) = key.chars().find(|c| !c.is_ascii_graphic()) {
        return Err(IdempotencyErrorKind::InvalidKey {
            message: format!("Idempotency key contains invalid character {:?}", c),
        }
        .into());
    }

    Ok(key)
}

/// Shorten a key for log output.
pub fn redact_idempotency_key(key: &str) -> String {
    if key.len() <= 8 {
        return "****".to_string();
    }
    format!("{}****", &key[..6])
}
