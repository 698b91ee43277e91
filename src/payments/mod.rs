//! Payment flows built on the authenticator and the processor boundary.

mod checkout;
mod reply;
mod webhook;

pub use checkout::{CheckoutPolicy, CheckoutService, CHECKOUT_SCOPE};
pub use reply::{failure_outcome, Disposition, ServiceReply};
pub use webhook::{EventRoute, WebhookService, WEBHOOK_SCOPE};
