//! Response types for the gateway endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::auth::StoredOutcome;
use crate::error::GateError;

/// Error body returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message. Fixed per code.
    pub error: String,

    /// Stable machine-readable code (e.g. "SIGNATURE_MISMATCH").
    pub code: String,

    /// Correlation identifier, also present in server logs.
    pub request_id: Uuid,

    /// Whether retrying the identical request may succeed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ErrorResponse {
    /// Build the client-facing body for an error.
    ///
    /// The internal detail of `err` is logged server-side only.
    pub fn from_error(request_id: Uuid, err: &GateError) -> Self {
        debug!(
            request_id = %request_id,
            code = err.code(),
            detail = %err,
            "Error response (sanitized for client)"
        );

        Self {
            error: err.public_message().to_string(),
            code: err.code().to_string(),
            request_id,
            retryable: err.is_retryable(),
        }
    }
}

/// An error paired with the request it belongs to, renderable by axum.
#[derive(Debug)]
pub struct ApiError {
    pub request_id: Uuid,
    pub error: GateError,
}

impl ApiError {
    pub fn new(request_id: Uuid, error: GateError) -> Self {
        Self { request_id, error }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let body = ErrorResponse::from_error(self.request_id, &self.error);
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        ApiError::new(Uuid::new_v4(), self).into_response()
    }
}

/// Render a stored idempotent outcome exactly as it was first returned.
pub fn outcome_response(outcome: &StoredOutcome) -> Response {
    let status = StatusCode::from_u16(outcome.http_status).unwrap_or(StatusCode::OK);
    (status, Json(outcome.body.clone())).into_response()
}

/// Body acknowledging a webhook.
pub fn webhook_ack() -> serde_json::Value {
    serde_json::json!({ "received": true })
}
