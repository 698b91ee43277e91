//! Request detail sanitization for audit logging.
//!
//! Secrets and signatures are dropped outright; payment-method identifiers
//! and idempotency keys are masked so entries can still be correlated.

use serde_json::{Map, Value};

use crate::validation::{mask_payment_method, redact_idempotency_key};

/// Keys whose values are replaced with `[REDACTED]`.
const SENSITIVE_KEYS: &[&str] = &[
    "signature",
    "secret",
    "password",
    "api_key",
    "authorization",
    "credential",
];

/// Keys whose values are payment-method identifiers.
const PAYMENT_METHOD_KEYS: &[&str] = &["payment_method", "token", "card"];

/// Maximum length for string values before truncation.
const MAX_STRING_LENGTH: usize = 256;

/// Sanitize request details for the audit log.
///
/// Recurses into nested objects and arrays.
pub fn sanitize_details(details: &Value) -> Value {
    match details {
        Value::Object(map) => {
            let mut sanitized = Map::new();
            for (key, val) in map {
                sanitized.insert(key.clone(), sanitize_field(key, val));
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_details).collect()),
        Value::String(s) if s.len() > MAX_STRING_LENGTH => {
            Value::String(format!("[TRUNCATED - {} bytes]", s.len()))
        }
        _ => details.clone(),
    }
}

fn sanitize_field(key: &str, value: &Value) -> Value {
    let key_lower = key.to_lowercase();

    if SENSITIVE_KEYS.iter().any(|&s| key_lower.contains(s)) {
        return Value::String("[REDACTED]".to_string());
    }

    if key_lower.contains("idempotency") {
        return match value {
            Value::String(s) => Value::String(redact_idempotency_key(s)),
            _ => Value::String("[REDACTED]".to_string()),
        };
    }

    if PAYMENT_METHOD_KEYS.iter().any(|&s| key_lower.contains(s)) {
        return match value {
            Value::String(s) => Value::String(mask_payment_method(s)),
            Value::Null => Value::Null,
            _ => Value::String("[REDACTED]".to_string()),
        };
    }

    sanitize_details(value)
}
