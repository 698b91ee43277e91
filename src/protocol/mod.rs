//! Wire protocol module.
//!
//! Defines the header contract, tagged request schemas per endpoint role,
//! and the response envelopes.
//!
//! ## Signing
//!
//! A payment submission carries:
//! ```text
//! x-signature:     hex(HMAC-SHA256(shared_secret, raw_body))
//! x-timestamp:     unix seconds | unix milliseconds | RFC 3339
//! idempotency-key: opaque client token
//! ```

mod request;
mod response;
mod wire;

pub use request::{
    InboundRequest, PaymentSubmission, SubmissionHeaders, HEADER_IDEMPOTENCY_KEY,
    HEADER_SIGNATURE, HEADER_SIGNATURE_LEGACY, HEADER_TIMESTAMP, HEADER_WEBHOOK_SIGNATURE,
};
pub use response::{outcome_response, webhook_ack, ApiError, ErrorResponse};
pub use wire::{header_str, parse_json_body, payment_submission, provider_webhook};
