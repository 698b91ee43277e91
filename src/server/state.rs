//! Shared handler state.

use std::sync::Arc;

use crate::audit::AuditSink;
use crate::auth::RateLimiter;
use crate::payments::{CheckoutService, WebhookService};

use super::metrics::RequestMetrics;

/// Everything a request handler needs, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<CheckoutService>,
    pub webhooks: Arc<WebhookService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub audit: Arc<dyn AuditSink>,
    pub metrics: Arc<RequestMetrics>,
}

impl AppState {
    pub fn new(
        checkout: CheckoutService,
        webhooks: WebhookService,
        rate_limiter: Arc<RateLimiter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            checkout: Arc::new(checkout),
            webhooks: Arc::new(webhooks),
            rate_limiter,
            audit,
            metrics: Arc::new(RequestMetrics::new()),
        }
    }
}
