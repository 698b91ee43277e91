//! Payment processor contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AuthErrorKind, GateError, PaymentErrorKind, ProtocolErrorKind};

/// Failures reported by the processor boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failure, timeout, 5xx or throttling. Retryable.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The processor refused the request. Terminal.
    #[error("provider rejected request: {0}")]
    Rejected(String),

    /// The webhook signature did not verify.
    #[error("webhook signature invalid")]
    InvalidSignature,

    /// The webhook verified but its payload is not an event.
    #[error("malformed event: {0}")]
    MalformedEvent(String),
}

impl From<ProviderError> for GateError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(message) => {
                PaymentErrorKind::ProviderUnavailable { message }.into()
            }
            ProviderError::Rejected(message) => PaymentErrorKind::ProviderRejected { message }.into(),
            ProviderError::InvalidSignature => AuthErrorKind::WebhookSignatureInvalid.into(),
            ProviderError::MalformedEvent(message) => GateError::Protocol {
                kind: ProtocolErrorKind::InvalidBody { message },
            },
        }
    }
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    /// Server-pinned amount in minor units.
    pub amount: u64,
    pub currency: String,
    pub payment_method: Option<String>,
    pub description: Option<String>,
    /// Forwarded so the processor deduplicates retries on its side too.
    pub idempotency_key: String,
}

/// A payment intent as returned by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub amount: u64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Payload wrapper of a webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// A verified webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Creation time in unix seconds.
    pub created: i64,
    pub data: WebhookEventData,
    #[serde(default)]
    pub livemode: bool,
}

/// Creates payment intents at the processor.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, ProviderError>;
}

/// The processor's webhook verification primitive.
#[async_trait]
pub trait WebhookVerifier: Send + Sync {
    /// Verify `raw_body` against the signature header and decode the event.
    async fn verify(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_mapping() {
        let unavailable: GateError = ProviderError::Unavailable("timeout".to_string()).into();
        assert_eq!(unavailable.code(), "PROVIDER_UNAVAILABLE");

        let rejected: GateError = ProviderError::Rejected("card_declined".to_string()).into();
        assert_eq!(rejected.code(), "PROVIDER_REJECTED");

        let invalid: GateError = ProviderError::InvalidSignature.into();
        assert_eq!(invalid.code(), "WEBHOOK_SIGNATURE_INVALID");
    }

    #[test]
    fn test_event_deserialization() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"payment_intent.succeeded","created":1700000000,
                "data":{"object":{"id":"pi_1","amount":2500000}}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.created, 1_700_000_000);
        assert!(!event.livemode);
        assert_eq!(event.data.object["id"], "pi_1");
    }

    #[test]
    fn test_intent_omits_missing_client_secret() {
        let intent = PaymentIntent {
            id: "pi_1".to_string(),
            status: "requires_confirmation".to_string(),
            amount: 2_500_000,
            currency: "usd".to_string(),
            client_secret: None,
        };
        let json = serde_json::to_string(&intent).unwrap();
        assert!(!json.contains("client_secret"));
    }
}
