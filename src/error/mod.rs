//! Error types for the payment gateway.
//!
//! Provides a unified error handling system using thiserror. Every error
//! carries a stable machine code and an HTTP status for the client.

mod types;

pub use types::*;
