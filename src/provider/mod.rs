//! Payment processor boundary.
//!
//! The processor is an opaque remote service exposing payment intent
//! creation and signed webhook events. Everything here is consumed through
//! the [`PaymentProvider`] and [`WebhookVerifier`] traits so tests and
//! alternative processors can be injected.

mod http;
mod timeout;
mod traits;
mod webhook_signature;

pub use http::HttpPaymentProvider;
pub use timeout::with_timeout;
pub use traits::{
    PaymentIntent, PaymentIntentRequest, PaymentProvider, ProviderError, WebhookEvent,
    WebhookEventData, WebhookVerifier,
};
pub use webhook_signature::SignedHeaderVerifier;
