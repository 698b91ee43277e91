//! Authentication of processor webhook callbacks.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{AuthErrorKind, GateError};
use crate::provider::{with_timeout, WebhookEvent, WebhookVerifier};

use super::ReplayWindow;

/// Lifecycle of one webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookState {
    Received,
    Verified,
    Routed,
    Rejected,
}

impl fmt::Display for WebhookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WebhookState::Received => "received",
            WebhookState::Verified => "verified",
            WebhookState::Routed => "routed",
            WebhookState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Verifies a webhook through the processor's scheme, then re-applies the
/// local freshness window to the event's own creation time.
pub struct WebhookAuthenticator {
    verifier: Arc<dyn WebhookVerifier>,
    window: ReplayWindow,
    timeout: Duration,
}

impl WebhookAuthenticator {
    pub fn new(verifier: Arc<dyn WebhookVerifier>, window: ReplayWindow, timeout: Duration) -> Self {
        Self {
            verifier,
            window,
            timeout,
        }
    }

    /// Move a delivery from `Received` to `Verified`, or fail it.
    ///
    /// A missing header never reaches the verifier. Nothing about the event
    /// is trusted until this returns `Ok`.
    pub async fn authenticate(
        &self,
        signature_header: Option<&str>,
        raw_body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<WebhookEvent, GateError> {
        debug!(state = %WebhookState::Received, bytes = raw_body.len(), "Webhook delivery");

        let header = match signature_header.map(str::trim).filter(|h| !h.is_empty()) {
            Some(header) => header,
            None => {
                warn!(state = %WebhookState::Rejected, "Webhook without signature header");
                return Err(AuthErrorKind::WebhookSignatureInvalid.into());
            }
        };

        let event = with_timeout(self.timeout, self.verifier.verify(raw_body, header))
            .await
            .map_err(|e| {
                warn!(state = %WebhookState::Rejected, error = %e, "Webhook verification failed");
                GateError::from(e)
            })?;

        if let Err(kind) = self.window.check_unix_seconds(event.created, now) {
            warn!(
                state = %WebhookState::Rejected,
                event_id = %event.id,
                "Webhook event outside replay window"
            );
            return Err(kind.into());
        }

        debug!(
            state = %WebhookState::Verified,
            event_id = %event.id,
            event_type = %event.event_type,
            "Webhook verified"
        );
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SignedHeaderVerifier;

    const SECRET: &[u8] = b"whsec_unit_test_secret";

    fn authenticator() -> WebhookAuthenticator {
        WebhookAuthenticator::new(
            Arc::new(SignedHeaderVerifier::from_bytes(SECRET).unwrap()),
            ReplayWindow::new(Duration::from_secs(300)),
            Duration::from_secs(5),
        )
    }

    fn event_body(created: i64) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "created": created,
            "data": { "object": { "id": "pi_1" } }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_valid_webhook_verified() {
        let now = Utc::now();
        let body = event_body(now.timestamp());
        let header = SignedHeaderVerifier::from_bytes(SECRET)
            .unwrap()
            .signature_header(&body, now.timestamp());
        let event = authenticator()
            .authenticate(Some(&header), &body, now)
            .await
            .unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let now = Utc::now();
        let body = event_body(now.timestamp());
        for header in [None, Some(""), Some("   ")] {
            let err = authenticator()
                .authenticate(header, &body, now)
                .await
                .unwrap_err();
            assert_eq!(err.code(), "WEBHOOK_SIGNATURE_INVALID");
        }
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let now = Utc::now();
        let body = event_body(now.timestamp());
        let header = SignedHeaderVerifier::from_bytes(b"some_other_secret")
            .unwrap()
            .signature_header(&body, now.timestamp());
        let err = authenticator()
            .authenticate(Some(&header), &body, now)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "WEBHOOK_SIGNATURE_INVALID");
    }

    #[tokio::test]
    async fn test_old_event_rejected_as_stale() {
        let now = Utc::now();
        let created = now.timestamp() - 3600;
        let body = event_body(created);
        let header = SignedHeaderVerifier::from_bytes(SECRET)
            .unwrap()
            .signature_header(&body, created);
        let err = authenticator()
            .authenticate(Some(&header), &body, now)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "STALE_REQUEST");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WebhookState::Routed.to_string(), "routed");
    }
}
