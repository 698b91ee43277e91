//! Service results handed to the HTTP layer and the audit log.

use uuid::Uuid;

use crate::auth::{OutcomeStatus, Rejection, StoredOutcome};
use crate::error::GateError;
use crate::protocol::ErrorResponse;

/// What the client receives.
#[derive(Debug)]
pub enum Disposition {
    /// An idempotent outcome, fresh or replayed from the ledger.
    Outcome(StoredOutcome),
    /// A refusal that was never recorded in the ledger.
    Failure(GateError),
}

/// Result of one service call.
#[derive(Debug)]
pub struct ServiceReply {
    pub disposition: Disposition,
    /// Every failure reason collected while handling the request.
    pub reason_codes: Vec<String>,
    /// The outcome came from the ledger rather than a fresh execution.
    pub replayed: bool,
}

impl ServiceReply {
    /// A freshly produced outcome.
    pub fn outcome(outcome: StoredOutcome) -> Self {
        Self {
            reason_codes: outcome_codes(&outcome),
            disposition: Disposition::Outcome(outcome),
            replayed: false,
        }
    }

    /// An outcome replayed for a retried key.
    pub fn replay(outcome: StoredOutcome) -> Self {
        Self {
            replayed: true,
            ..Self::outcome(outcome)
        }
    }

    /// A single failure.
    pub fn failure(error: GateError) -> Self {
        Self {
            reason_codes: vec![error.code().to_string()],
            disposition: Disposition::Failure(error),
            replayed: false,
        }
    }

    /// An authentication rejection. All reasons are kept for the audit log;
    /// only the primary one is rendered.
    pub fn rejected(rejection: Rejection) -> Self {
        let reason_codes = rejection
            .reason_codes()
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            disposition: Disposition::Failure(rejection.into_primary()),
            reason_codes,
            replayed: false,
        }
    }

    /// Whether the request was accepted.
    pub fn accepted(&self) -> bool {
        matches!(
            &self.disposition,
            Disposition::Outcome(outcome) if outcome.status == OutcomeStatus::Completed
        )
    }

    /// HTTP status the client receives.
    pub fn http_status(&self) -> u16 {
        match &self.disposition {
            Disposition::Outcome(outcome) => outcome.http_status,
            Disposition::Failure(error) => error.status().as_u16(),
        }
    }
}

/// Terminal failure recorded in the ledger, rendered exactly like a live error.
pub fn failure_outcome(request_id: Uuid, error: &GateError) -> Result<StoredOutcome, GateError> {
    let body = serde_json::to_value(ErrorResponse::from_error(request_id, error))?;
    Ok(StoredOutcome::failed(error.status().as_u16(), body))
}

fn outcome_codes(outcome: &StoredOutcome) -> Vec<String> {
    match outcome.status {
        OutcomeStatus::Completed => Vec::new(),
        OutcomeStatus::Failed => outcome
            .body
            .get("code")
            .and_then(|c| c.as_str())
            .map(|c| vec![c.to_string()])
            .unwrap_or_default(),
    }
}
