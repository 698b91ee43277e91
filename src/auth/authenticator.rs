//! Authentication of direct payment submissions.
//!
//! Every check runs regardless of earlier failures so the full set of
//! reasons reaches the logs; the client only ever sees the highest-ranked one.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{AuthErrorKind, GateError, IdempotencyErrorKind};
use crate::protocol::SubmissionHeaders;
use crate::validation::validate_idempotency_key;

use super::{parse_timestamp, ReplayWindow, SignatureVerifier};

/// A submission that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubmission {
    /// Validated idempotency key.
    pub idempotency_key: String,
    /// The timestamp the client claimed, already inside the window.
    pub claimed_at: DateTime<Utc>,
}

/// All reasons a submission was refused, most security-relevant first.
#[derive(Debug)]
pub struct Rejection {
    failures: Vec<GateError>,
}

impl Rejection {
    fn new(mut failures: Vec<GateError>) -> Self {
        failures.sort_by_key(rank);
        Self { failures }
    }

    /// Machine codes of every failure, in rank order.
    pub fn reason_codes(&self) -> Vec<&'static str> {
        self.failures.iter().map(GateError::code).collect()
    }

    /// The failure reported to the client.
    pub fn primary(&self) -> &GateError {
        &self.failures[0]
    }

    /// Consume into the failure reported to the client.
    pub fn into_primary(self) -> GateError {
        self.failures
            .into_iter()
            .next()
            .unwrap_or(GateError::Auth {
                kind: AuthErrorKind::SignatureMismatch,
            })
    }
}

/// Lower ranks win. A payment-mutating request without an idempotency key
/// is refused as such whatever else is wrong with it.
fn rank(err: &GateError) -> u8 {
    match err {
        GateError::Idempotency {
            kind: IdempotencyErrorKind::MissingKey,
        } => 0,
        GateError::Idempotency { .. } => 1,
        GateError::Auth {
            kind: AuthErrorKind::SignatureMismatch,
        } => 2,
        GateError::Auth {
            kind: AuthErrorKind::MissingTimestamp,
        } => 3,
        GateError::Auth {
            kind: AuthErrorKind::StaleRequest { .. },
        } => 4,
        _ => 5,
    }
}

/// Signature + freshness + idempotency-key presence for submissions.
pub struct InboundAuthenticator {
    verifier: SignatureVerifier,
    window: ReplayWindow,
}

impl InboundAuthenticator {
    /// Create a new authenticator.
    pub fn new(verifier: SignatureVerifier, window: ReplayWindow) -> Self {
        Self { verifier, window }
    }

    /// The freshness window in use.
    pub fn window(&self) -> &ReplayWindow {
        &self.window
    }

    /// Authenticate a submission against its exact wire body.
    pub fn authenticate(
        &self,
        headers: &SubmissionHeaders,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedSubmission, Rejection> {
        let mut failures = Vec::new();

        let idempotency_key = match validate_idempotency_key(headers.idempotency_key.as_deref()) {
            Ok(key) => Some(key.to_string()),
            Err(e) => {
                failures.push(e);
                None
            }
        };

        let signature_result = match headers.signature.as_deref() {
            Some(signature) => self.verifier.verify(body, signature),
            None => Err(AuthErrorKind::SignatureMismatch),
        };
        if let Err(kind) = signature_result {
            failures.push(kind.into());
        }

        let claimed_at = match self.window.check(headers.timestamp.as_deref(), now) {
            Ok(()) => headers
                .timestamp
                .as_deref()
                .and_then(parse_timestamp),
            Err(kind) => {
                failures.push(kind.into());
                None
            }
        };

        match (idempotency_key, claimed_at) {
            (Some(idempotency_key), Some(claimed_at)) if failures.is_empty() => {
                Ok(AuthenticatedSubmission {
                    idempotency_key,
                    claimed_at,
                })
            }
            _ => {
                let rejection = Rejection::new(failures);
                warn!(
                    reasons = ?rejection.reason_codes(),
                    "Payment submission failed authentication"
                );
                Err(rejection)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn authenticator() -> InboundAuthenticator {
        InboundAuthenticator::new(
            SignatureVerifier::from_bytes(b"test-secret-key-32-bytes-long!!").unwrap(),
            ReplayWindow::new(Duration::from_secs(300)),
        )
    }

    fn signer() -> SignatureVerifier {
        SignatureVerifier::from_bytes(b"test-secret-key-32-bytes-long!!").unwrap()
    }

    fn headers(body: &[u8], key: Option<&str>, ts: Option<String>) -> SubmissionHeaders {
        SubmissionHeaders {
            signature: Some(signer().sign(body)),
            timestamp: ts,
            idempotency_key: key.map(str::to_string),
        }
    }

    #[test]
    fn test_valid_submission() {
        let now = Utc::now();
        let body = br#"{"amount":2500000}"#;
        let h = headers(body, Some("key-1"), Some(now.timestamp().to_string()));
        let ok = authenticator().authenticate(&h, body, now).unwrap();
        assert_eq!(ok.idempotency_key, "key-1");
    }

    #[test]
    fn test_missing_signature_is_signature_mismatch() {
        let now = Utc::now();
        let body = br#"{"amount":1000}"#;
        let mut h = headers(body, Some("key-1"), Some(now.timestamp().to_string()));
        h.signature = None;
        let rejection = authenticator().authenticate(&h, body, now).unwrap_err();
        assert_eq!(rejection.primary().code(), "SIGNATURE_MISMATCH");
        assert_eq!(rejection.reason_codes(), vec!["SIGNATURE_MISMATCH"]);
    }

    #[test]
    fn test_missing_key_wins_over_everything() {
        let now = Utc::now();
        let body = br#"{"amount":1000}"#;
        let h = SubmissionHeaders {
            signature: Some("00".repeat(32)),
            timestamp: None,
            idempotency_key: None,
        };
        let rejection = authenticator().authenticate(&h, body, now).unwrap_err();
        assert_eq!(
            rejection.reason_codes(),
            vec!["MISSING_IDEMPOTENCY_KEY", "SIGNATURE_MISMATCH", "MISSING_TIMESTAMP"]
        );
        assert_eq!(rejection.into_primary().public_message(), "Idempotency key required");
    }

    #[test]
    fn test_stale_with_valid_signature_and_key() {
        let now = Utc::now();
        let body = br#"{"amount":2500000}"#;
        let ts = (now - ChronoDuration::minutes(10)).timestamp().to_string();
        let h = headers(body, Some("key-1"), Some(ts));
        let rejection = authenticator().authenticate(&h, body, now).unwrap_err();
        assert_eq!(rejection.primary().code(), "STALE_REQUEST");
        assert_eq!(
            rejection.primary().public_message(),
            "Request timestamp outside replay window"
        );
    }

    #[test]
    fn test_checks_not_short_circuited() {
        let now = Utc::now();
        let body = br#"{"amount":2500000}"#;
        let ts = (now + ChronoDuration::minutes(30)).timestamp().to_string();
        let h = SubmissionHeaders {
            signature: Some("bad".to_string()),
            timestamp: Some(ts),
            idempotency_key: Some("key-1".to_string()),
        };
        let rejection = authenticator().authenticate(&h, body, now).unwrap_err();
        assert_eq!(
            rejection.reason_codes(),
            vec!["SIGNATURE_MISMATCH", "STALE_REQUEST"]
        );
    }

    #[test]
    fn test_missing_key_regardless_of_other_validity() {
        let now = Utc::now();
        let body = br#"{"amount":2500000}"#;
        let cases = [
            headers(body, None, Some(now.timestamp().to_string())),
            headers(body, None, None),
            SubmissionHeaders {
                signature: None,
                timestamp: Some(now.timestamp().to_string()),
                idempotency_key: None,
            },
        ];
        for h in cases {
            let rejection = authenticator().authenticate(&h, body, now).unwrap_err();
            assert_eq!(rejection.primary().code(), "MISSING_IDEMPOTENCY_KEY");
        }
    }
}
