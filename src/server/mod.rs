//! HTTP server module.
//!
//! Exposes the payment submission and webhook endpoints over axum, with
//! per-client rate limiting, security headers and graceful shutdown.

mod handlers;
mod listener;
mod metrics;
mod router;
mod state;

pub use handlers::HEADER_REQUEST_ID;
pub use listener::{wait_for_drain, GateServer};
pub use metrics::{InFlightGuard, RequestMetrics};
pub use router::build_router;
pub use state::AppState;
