//! Input validation module.
//!
//! Provides validators for idempotency keys and payment method tokens.

mod idempotency_key;
mod payment_method;

pub use idempotency_key::{redact_idempotency_key, validate_idempotency_key};
pub use payment_method::{mask_payment_method, validate_payment_method};
