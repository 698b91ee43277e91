//! Direct payment submissions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{fingerprint, Begin, IdempotencyStore, InboundAuthenticator, LeaseGuard, StoredOutcome};
use crate::error::{GateError, IdempotencyErrorKind, PaymentErrorKind};
use crate::protocol::{parse_json_body, PaymentSubmission, SubmissionHeaders};
use crate::provider::{with_timeout, PaymentIntentRequest, PaymentProvider, ProviderError};
use crate::validation::{mask_payment_method, redact_idempotency_key, validate_payment_method};

use super::reply::{failure_outcome, ServiceReply};

/// Ledger scope for payment intent creation.
pub const CHECKOUT_SCOPE: &str = "payment_intent";

/// Server-side pricing. The client never chooses what is charged.
#[derive(Debug, Clone)]
pub struct CheckoutPolicy {
    pub expected_amount: u64,
    /// Lowercase ISO 4217 code.
    pub currency: String,
    pub provider_timeout: Duration,
}

impl CheckoutPolicy {
    pub fn new(expected_amount: u64, currency: &str, provider_timeout: Duration) -> Self {
        Self {
            expected_amount,
            currency: currency.to_ascii_lowercase(),
            provider_timeout,
        }
    }

    /// Reject a submission whose amount or currency differs from the pinned price.
    pub fn check(&self, submission: &PaymentSubmission) -> Result<(), GateError> {
        if submission.amount != self.expected_amount {
            return Err(PaymentErrorKind::InvalidAmount {
                expected: self.expected_amount,
                received: submission.amount,
            }
            .into());
        }

        if let Some(currency) = &submission.currency {
            if !currency.eq_ignore_ascii_case(&self.currency) {
                return Err(PaymentErrorKind::InvalidCurrency {
                    expected: self.currency.clone(),
                    received: currency.clone(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Authenticates submissions and creates at most one payment intent per key.
pub struct CheckoutService {
    authenticator: InboundAuthenticator,
    ledger: Arc<dyn IdempotencyStore>,
    provider: Arc<dyn PaymentProvider>,
    policy: CheckoutPolicy,
}

impl CheckoutService {
    pub fn new(
        authenticator: InboundAuthenticator,
        ledger: Arc<dyn IdempotencyStore>,
        provider: Arc<dyn PaymentProvider>,
        policy: CheckoutPolicy,
    ) -> Self {
        Self {
            authenticator,
            ledger,
            provider,
            policy,
        }
    }

    /// Handle one submission end to end.
    pub async fn submit(
        &self,
        request_id: Uuid,
        headers: &SubmissionHeaders,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> ServiceReply {
        match self.process(request_id, headers, body, now).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(request_id = %request_id, code = error.code(), "Payment submission refused");
                ServiceReply::failure(error)
            }
        }
    }

    async fn process(
        &self,
        request_id: Uuid,
        headers: &SubmissionHeaders,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<ServiceReply, GateError> {
        let authenticated = match self.authenticator.authenticate(headers, body, now) {
            Ok(authenticated) => authenticated,
            Err(rejection) => return Ok(ServiceReply::rejected(rejection)),
        };
        let key = authenticated.idempotency_key;

        let submission: PaymentSubmission = parse_json_body(body)?;
        self.policy.check(&submission)?;

        let payment_method = submission
            .payment_method
            .as_deref()
            .map(validate_payment_method)
            .transpose()?
            .map(str::to_string);

        let lease = match self.ledger.begin(CHECKOUT_SCOPE, &key, &fingerprint(body))? {
            Begin::Started(lease) => lease,
            Begin::AlreadyCompleted(outcome) => {
                info!(
                    request_id = %request_id,
                    idempotency_key = %redact_idempotency_key(&key),
                    "Replaying stored payment outcome"
                );
                return Ok(ServiceReply::replay(outcome));
            }
            Begin::InFlight => return Err(IdempotencyErrorKind::DuplicateInFlight.into()),
        };
        // The processor call must end before the lease lapses, or a retry
        // could take the key over and charge a second time.
        let budget = self.policy.provider_timeout.min(lease.remaining());
        let guard = LeaseGuard::new(Arc::clone(&self.ledger), lease);

        let masked_method = payment_method.as_deref().map(mask_payment_method);
        debug!(
            request_id = %request_id,
            idempotency_key = %redact_idempotency_key(&key),
            payment_method = ?masked_method,
            "Creating payment intent"
        );

        let request = PaymentIntentRequest {
            amount: self.policy.expected_amount,
            currency: self.policy.currency.clone(),
            payment_method,
            description: submission.description,
            idempotency_key: key.clone(),
        };

        let result = with_timeout(budget, self.provider.create_payment_intent(&request)).await;

        match result {
            Ok(intent) => {
                info!(
                    request_id = %request_id,
                    payment_intent = %intent.id,
                    status = %intent.status,
                    "Payment intent created"
                );
                let outcome = StoredOutcome::completed(
                    200,
                    json!({
                        "status": "success",
                        "processed": true,
                        "payment_intent": &intent,
                    }),
                );
                if let Err(e) = guard.complete(outcome.clone()) {
                    warn!(
                        request_id = %request_id,
                        payment_intent = %intent.id,
                        idempotency_key = %redact_idempotency_key(&key),
                        error = %e,
                        "Payment intent created but outcome could not be recorded"
                    );
                    return Err(e);
                }
                Ok(ServiceReply::outcome(outcome))
            }
            Err(ProviderError::Unavailable(message)) => {
                // Retryable: free the key, the processor dedupes on its side.
                warn!(request_id = %request_id, error = %message, "Payment provider unavailable");
                guard.release();
                Err(PaymentErrorKind::ProviderUnavailable { message }.into())
            }
            Err(other) => {
                let error = GateError::from(other);
                warn!(request_id = %request_id, error = %error, "Payment provider rejected request");
                let outcome = failure_outcome(request_id, &error)?;
                guard.fail(outcome.clone())?;
                Ok(ServiceReply::outcome(outcome))
            }
        }
    }
}
