//! Error types for the payment gateway.

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for the gateway.
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration-related errors. Fatal at startup.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Listener / runtime errors.
    #[error("Server error: {message}")]
    Server { message: String },

    /// Authentication errors.
    #[error("Authentication error: {kind}")]
    Auth { kind: AuthErrorKind },

    /// Idempotency ledger errors.
    #[error("Idempotency error: {kind}")]
    Idempotency { kind: IdempotencyErrorKind },

    /// Payment and provider errors.
    #[error("Payment error: {kind}")]
    Payment { kind: PaymentErrorKind },

    /// Protocol errors.
    #[error("Protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },

    /// Client exceeded its request budget.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Authentication error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    #[error("Signature does not match request body")]
    SignatureMismatch,

    #[error("Timestamp missing or unparsable")]
    MissingTimestamp,

    #[error("Request timestamp skewed by {skew_seconds}s, outside replay window")]
    StaleRequest { skew_seconds: u64 },

    #[error("Webhook signature verification failed")]
    WebhookSignatureInvalid,
}

/// Idempotency error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyErrorKind {
    #[error("Idempotency key missing")]
    MissingKey,

    #[error("Invalid idempotency key: {message}")]
    InvalidKey { message: String },

    #[error("A request with this idempotency key is still processing")]
    DuplicateInFlight,

    #[error("Idempotency key reused with a different request body")]
    Conflict,

    #[error("Idempotency lease expired or was taken over before resolution")]
    LeaseLost,
}

/// Payment error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentErrorKind {
    #[error("Amount {received} does not match expected amount {expected}")]
    InvalidAmount { expected: u64, received: u64 },

    #[error("Currency '{received}' does not match expected currency '{expected}'")]
    InvalidCurrency { expected: String, received: String },

    #[error("Payment provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    #[error("Payment provider rejected the request: {message}")]
    ProviderRejected { message: String },
}

/// Protocol error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },

    #[error("Request body too large")]
    BodyTooLarge,

    #[error("Request timed out")]
    Timeout,

    #[error("No route for {path}")]
    NotFound { path: String },
}

impl GateError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            GateError::Auth { kind } => match kind {
                AuthErrorKind::SignatureMismatch => "SIGNATURE_MISMATCH",
                AuthErrorKind::MissingTimestamp => "MISSING_TIMESTAMP",
                AuthErrorKind::StaleRequest { .. } => "STALE_REQUEST",
                AuthErrorKind::WebhookSignatureInvalid => "WEBHOOK_SIGNATURE_INVALID",
            },
            GateError::Idempotency { kind } => match kind {
                IdempotencyErrorKind::MissingKey => "MISSING_IDEMPOTENCY_KEY",
                IdempotencyErrorKind::InvalidKey { .. } => "INVALID_IDEMPOTENCY_KEY",
                IdempotencyErrorKind::DuplicateInFlight => "DUPLICATE_IN_FLIGHT",
                IdempotencyErrorKind::Conflict => "IDEMPOTENCY_CONFLICT",
                IdempotencyErrorKind::LeaseLost => "LEASE_LOST",
            },
            GateError::Payment { kind } => match kind {
                PaymentErrorKind::InvalidAmount { .. } => "INVALID_AMOUNT",
                PaymentErrorKind::InvalidCurrency { .. } => "INVALID_CURRENCY",
                PaymentErrorKind::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
                PaymentErrorKind::ProviderRejected { .. } => "PROVIDER_REJECTED",
            },
            GateError::Protocol { kind } => match kind {
                ProtocolErrorKind::InvalidBody { .. } => "INVALID_BODY",
                ProtocolErrorKind::BodyTooLarge => "BODY_TOO_LARGE",
                ProtocolErrorKind::Timeout => "REQUEST_TIMEOUT",
                ProtocolErrorKind::NotFound { .. } => "NOT_FOUND",
            },
            GateError::RateLimited => "RATE_LIMITED",
            GateError::Config { .. } => "CONFIGURATION_ERROR",
            GateError::Server { .. } | GateError::Io(_) | GateError::Serialization(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::Auth { kind } => match kind {
                AuthErrorKind::SignatureMismatch => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_REQUEST,
            },
            GateError::Idempotency { kind } => match kind {
                IdempotencyErrorKind::MissingKey | IdempotencyErrorKind::InvalidKey { .. } => {
                    StatusCode::BAD_REQUEST
                }
                IdempotencyErrorKind::DuplicateInFlight | IdempotencyErrorKind::LeaseLost => {
                    StatusCode::CONFLICT
                }
                IdempotencyErrorKind::Conflict => StatusCode::UNPROCESSABLE_ENTITY,
            },
            GateError::Payment { kind } => match kind {
                PaymentErrorKind::InvalidAmount { .. } | PaymentErrorKind::InvalidCurrency { .. } => {
                    StatusCode::BAD_REQUEST
                }
                PaymentErrorKind::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                PaymentErrorKind::ProviderRejected { .. } => StatusCode::BAD_GATEWAY,
            },
            GateError::Protocol { kind } => match kind {
                ProtocolErrorKind::InvalidBody { .. } => StatusCode::BAD_REQUEST,
                ProtocolErrorKind::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                ProtocolErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
                ProtocolErrorKind::NotFound { .. } => StatusCode::NOT_FOUND,
            },
            GateError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GateError::Config { .. }
            | GateError::Server { .. }
            | GateError::Io(_)
            | GateError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Fixed per code so internal detail never leaks.
    pub fn public_message(&self) -> &'static str {
        match self.code() {
            "SIGNATURE_MISMATCH" => "Invalid signature",
            "MISSING_TIMESTAMP" => "Request timestamp missing or invalid",
            "STALE_REQUEST" => "Request timestamp outside replay window",
            "WEBHOOK_SIGNATURE_INVALID" => "Webhook signature verification failed",
            "MISSING_IDEMPOTENCY_KEY" => "Idempotency key required",
            "INVALID_IDEMPOTENCY_KEY" => "Idempotency key is malformed",
            "DUPLICATE_IN_FLIGHT" => "A request with this idempotency key is still processing",
            "IDEMPOTENCY_CONFLICT" => "Idempotency key was already used with a different request",
            "LEASE_LOST" => "Request superseded by a retry with the same idempotency key",
            "INVALID_AMOUNT" => "Invalid amount",
            "INVALID_CURRENCY" => "Invalid currency",
            "PROVIDER_UNAVAILABLE" => "Payment provider unavailable, try again later",
            "PROVIDER_REJECTED" => "Payment could not be processed",
            "INVALID_BODY" => "Invalid request body",
            "BODY_TOO_LARGE" => "Request body too large",
            "REQUEST_TIMEOUT" => "Request timed out",
            "RATE_LIMITED" => "Too many requests",
            "NOT_FOUND" => "Not found",
            _ => "Internal server error",
        }
    }

    /// Whether the client may retry the identical request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GateError::Payment {
                kind: PaymentErrorKind::ProviderUnavailable { .. }
            } | GateError::Idempotency {
                kind: IdempotencyErrorKind::DuplicateInFlight
            } | GateError::RateLimited
        )
    }
}

impl From<AuthErrorKind> for GateError {
    fn from(kind: AuthErrorKind) -> Self {
        GateError::Auth { kind }
    }
}

impl From<IdempotencyErrorKind> for GateError {
    fn from(kind: IdempotencyErrorKind) -> Self {
        GateError::Idempotency { kind }
    }
}

impl From<PaymentErrorKind> for GateError {
    fn from(kind: PaymentErrorKind) -> Self {
        GateError::Payment { kind }
    }
}

/// Result type alias for gateway operations.
pub type GateResult<T> = Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_mismatch_is_unauthorized() {
        let err = GateError::from(AuthErrorKind::SignatureMismatch);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "SIGNATURE_MISMATCH");
        assert_eq!(err.public_message(), "Invalid signature");
    }

    #[test]
    fn test_provider_unavailable_is_retryable_503() {
        let err = GateError::from(PaymentErrorKind::ProviderUnavailable {
            message: "connect timeout to api.internal:443".to_string(),
        });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_retryable());
        assert!(!err.public_message().contains("api.internal"));
    }

    #[test]
    fn test_internal_errors_do_not_leak() {
        let err = GateError::Config {
            message: "secret at /etc/payment-gate/hmac.key unreadable".to_string(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_idempotency_statuses() {
        assert_eq!(
            GateError::from(IdempotencyErrorKind::MissingKey).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GateError::from(IdempotencyErrorKind::DuplicateInFlight).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            GateError::from(IdempotencyErrorKind::Conflict).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
