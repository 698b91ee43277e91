//! Request types for the gateway endpoints.

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// Hex HMAC-SHA256 of the raw body.
pub const HEADER_SIGNATURE: &str = "x-signature";
/// Legacy name for the submission signature header.
pub const HEADER_SIGNATURE_LEGACY: &str = "x-stripe-signature";
/// Claimed request time (unix seconds, unix milliseconds or RFC 3339).
pub const HEADER_TIMESTAMP: &str = "x-timestamp";
/// Client idempotency token.
pub const HEADER_IDEMPOTENCY_KEY: &str = "idempotency-key";
/// Provider webhook signature header (`t=...,v1=...`).
pub const HEADER_WEBHOOK_SIGNATURE: &str = "stripe-signature";

/// Body of a direct payment submission.
///
/// Parsed from the raw bytes only after the signature over those exact
/// bytes has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentSubmission {
    /// Amount in minor units. Must equal the configured price.
    pub amount: u64,
    /// ISO 4217 currency; defaults to the configured currency.
    #[serde(default)]
    pub currency: Option<String>,
    /// Processor payment method token.
    #[serde(default, alias = "token")]
    pub payment_method: Option<String>,
    /// Free-form description forwarded to the processor.
    #[serde(default)]
    pub description: Option<String>,
}

/// Authentication-relevant headers of a payment submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionHeaders {
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    pub idempotency_key: Option<String>,
}

/// An inbound request, tagged by endpoint role.
#[derive(Debug, Clone)]
pub enum InboundRequest {
    /// Direct, client-signed payment submission.
    PaymentSubmission {
        headers: SubmissionHeaders,
        body: Bytes,
    },
    /// Asynchronous callback from the payment processor.
    ProviderWebhook {
        signature_header: Option<String>,
        body: Bytes,
    },
}

impl InboundRequest {
    /// Endpoint label for logs and audit entries.
    pub fn endpoint(&self) -> &'static str {
        match self {
            InboundRequest::PaymentSubmission { .. } => "payment_submission",
            InboundRequest::ProviderWebhook { .. } => "provider_webhook",
        }
    }

    /// The exact bytes received on the wire.
    pub fn body(&self) -> &Bytes {
        match self {
            InboundRequest::PaymentSubmission { body, .. }
            | InboundRequest::ProviderWebhook { body, .. } => body,
        }
    }
}
