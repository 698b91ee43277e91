//! Payment Gate Library
//!
//! Inbound payment event authentication and replay defense: HMAC-signed
//! payment submissions, processor webhooks, a bounded replay window and an
//! idempotency ledger guaranteeing at most one payment intent per key.

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod payments;
pub mod protocol;
pub mod provider;
pub mod server;
pub mod validation;
