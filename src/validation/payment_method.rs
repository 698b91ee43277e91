//! Payment method token validation.

use crate::error::{GateError, ProtocolErrorKind};

/// Maximum length of a payment method token.
const MAX_TOKEN_LENGTH: usize = 255;

/// Validate a client-supplied payment method token (e.g. `pm_...`, `tok_...`).
///
/// Tokens are forwarded to the processor, so only alphanumerics,
/// underscores and hyphens are accepted.
pub fn validate_payment_method(token: &str) -> Result<&str, GateError> {
    if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
        return Err(invalid("payment_method must be 1-255 characters"));
    }

    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid(
            "payment_method may only contain letters, digits, underscores and hyphens",
        ));
    }

    Ok(token)
}

/// Mask a payment method identifier for logs, keeping the type prefix and last four.
pub fn mask_payment_method(token: &str) -> String {
    let (prefix, rest) = match token.find('_') {
        Some(idx) => token.split_at(idx + 1),
        None => ("", token),
    };

    if rest.len() <= 4 {
        return format!("{}****", prefix);
    }

    format!("{}****{}", prefix, &rest[rest.len() - 4..])
}

fn invalid(message: &str) -> GateError {
    GateError::Protocol {
        kind: ProtocolErrorKind::InvalidBody {
            message: message.to_string(),
        },
    }
}
