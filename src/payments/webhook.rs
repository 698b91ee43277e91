//! Processor webhook intake.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{fingerprint, Begin, IdempotencyStore, StoredOutcome, WebhookAuthenticator, WebhookState};
use crate::error::{GateError, IdempotencyErrorKind};
use crate::protocol::webhook_ack;
use crate::provider::WebhookEvent;

use super::reply::ServiceReply;

/// Ledger scope for processed webhook event ids.
pub const WEBHOOK_SCOPE: &str = "webhook_event";

/// Where a verified event was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRoute {
    PaymentSucceeded,
    PaymentFailed,
    /// Accepted and logged, nothing else.
    Unhandled,
}

impl EventRoute {
    pub fn for_event_type(event_type: &str) -> Self {
        match event_type {
            "payment_intent.succeeded" => EventRoute::PaymentSucceeded,
            "payment_intent.payment_failed" => EventRoute::PaymentFailed,
            _ => EventRoute::Unhandled,
        }
    }
}

/// Authenticates webhook deliveries and routes each event id once.
pub struct WebhookService {
    authenticator: WebhookAuthenticator,
    ledger: Arc<dyn IdempotencyStore>,
}

impl WebhookService {
    pub fn new(authenticator: WebhookAuthenticator, ledger: Arc<dyn IdempotencyStore>) -> Self {
        Self {
            authenticator,
            ledger,
        }
    }

    /// Handle one delivery.
    pub async fn receive(
        &self,
        request_id: Uuid,
        signature_header: Option<&str>,
        raw_body: &[u8],
        now: DateTime<Utc>,
    ) -> ServiceReply {
        match self.process(request_id, signature_header, raw_body, now).await {
            Ok(reply) => reply,
            Err(error) => ServiceReply::failure(error),
        }
    }

    async fn process(
        &self,
        request_id: Uuid,
        signature_header: Option<&str>,
        raw_body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<ServiceReply, GateError> {
        let event = self
            .authenticator
            .authenticate(signature_header, raw_body, now)
            .await?;

        let lease = match self.ledger.begin(WEBHOOK_SCOPE, &event.id, &fingerprint(raw_body))? {
            Begin::Started(lease) => lease,
            Begin::AlreadyCompleted(outcome) => {
                info!(request_id = %request_id, event_id = %event.id, "Duplicate webhook delivery acknowledged");
                return Ok(ServiceReply::replay(outcome));
            }
            Begin::InFlight => return Err(IdempotencyErrorKind::DuplicateInFlight.into()),
        };

        let route = route(request_id, &event);
        info!(
            request_id = %request_id,
            state = %WebhookState::Routed,
            event_id = %event.id,
            route = ?route,
            "Webhook routed"
        );

        let outcome = StoredOutcome::completed(200, webhook_ack());
        self.ledger.complete(&lease, outcome.clone())?;
        Ok(ServiceReply::outcome(outcome))
    }
}

fn route(request_id: Uuid, event: &WebhookEvent) -> EventRoute {
    let route = EventRoute::for_event_type(&event.event_type);
    let intent_id = event.data.object.get("id").and_then(|v| v.as_str()).unwrap_or("unknown");

    match route {
        EventRoute::PaymentSucceeded => {
            info!(request_id = %request_id, payment_intent = intent_id, "Payment succeeded");
        }
        EventRoute::PaymentFailed => {
            warn!(request_id = %request_id, payment_intent = intent_id, "Payment failed");
        }
        EventRoute::Unhandled => {
            info!(request_id = %request_id, event_type = %event.event_type, "Unhandled event type");
        }
    }

    route
}
