//! Authentication module.
//!
//! Handles HMAC request signatures, replay-window enforcement, the
//! idempotency ledger, webhook verification and per-client rate limiting.

mod authenticator;
mod hmac;
mod idempotency;
mod rate_limit;
mod replay;
mod webhook;

pub use authenticator::{AuthenticatedSubmission, InboundAuthenticator, Rejection};
pub use hmac::SignatureVerifier;
pub use idempotency::{
    fingerprint, Begin, IdempotencyStore, InMemoryIdempotencyStore, Lease, LeaseGuard,
    OutcomeStatus, StoredOutcome,
};
pub use rate_limit::RateLimiter;
pub use replay::{parse_timestamp, ReplayWindow};
pub use webhook::{WebhookAuthenticator, WebhookState};
