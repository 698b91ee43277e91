//! Audit entry types.

use std::net::IpAddr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One inbound request and what was decided about it.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// RFC 3339 timestamp when the request was received.
    pub timestamp: String,
    pub request_id: Uuid,
    /// Endpoint role (`payment_submission`, `provider_webhook`).
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<IpAddr>,
    pub outcome: AuditOutcome,
    /// HTTP status returned to the client.
    pub http_status: u16,
    /// Redacted idempotency key, if one was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// The response was replayed from the idempotency ledger.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub replayed: bool,
    /// Sanitized request details.
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
    pub duration_ms: u64,
}

impl AuditEntry {
    /// Create an entry for an accepted request.
    pub fn accepted(received_at: DateTime<Utc>, request_id: Uuid, endpoint: &str) -> Self {
        Self::new(received_at, request_id, endpoint, AuditOutcome::Accepted)
    }

    /// Create an entry for a rejected request with every reason collected.
    pub fn rejected(
        received_at: DateTime<Utc>,
        request_id: Uuid,
        endpoint: &str,
        reason_codes: Vec<String>,
    ) -> Self {
        Self::new(
            received_at,
            request_id,
            endpoint,
            AuditOutcome::Rejected { reason_codes },
        )
    }

    fn new(received_at: DateTime<Utc>, request_id: Uuid, endpoint: &str, outcome: AuditOutcome) -> Self {
        Self {
            timestamp: received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            request_id,
            endpoint: endpoint.to_string(),
            client_ip: None,
            outcome,
            http_status: 0,
            idempotency_key: None,
            replayed: false,
            details: serde_json::Value::Null,
            duration_ms: 0,
        }
    }

    pub fn with_client_ip(mut self, client_ip: Option<IpAddr>) -> Self {
        self.client_ip = client_ip;
        self
    }

    pub fn with_http_status(mut self, http_status: u16) -> Self {
        self.http_status = http_status;
        self
    }

    /// Attach an idempotency key. Callers pass the redacted form.
    pub fn with_idempotency_key(mut self, redacted: Option<String>) -> Self {
        self.idempotency_key = redacted;
        self
    }

    pub fn with_replayed(mut self, replayed: bool) -> Self {
        self.replayed = replayed;
        self
    }

    /// Attach details. Callers pass already sanitized values.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Decision recorded for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    Accepted,
    Rejected {
        /// Every failure found, most security-relevant first.
        reason_codes: Vec<String>,
    },
}
