//! Request handlers.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{sanitize_details, AuditEntry};
use crate::error::{GateError, ProtocolErrorKind};
use crate::payments::{Disposition, ServiceReply};
use crate::protocol::{
    outcome_response, payment_submission, provider_webhook, ApiError, InboundRequest,
};
use crate::validation::redact_idempotency_key;

use super::state::AppState;

/// Response header carrying the correlation id.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// `POST /api/payments` and `POST /process-payment`.
pub async fn submit_payment(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let client_ip = connect_info.map(|ConnectInfo(addr)| addr.ip());
    handle(
        &state,
        client_ip,
        "payment_submission",
        body.map(|body| payment_submission(&headers, body)),
    )
    .await
}

/// `POST /webhooks/payments`.
pub async fn receive_webhook(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let client_ip = connect_info.map(|ConnectInfo(addr)| addr.ip());
    handle(
        &state,
        client_ip,
        "provider_webhook",
        body.map(|body| provider_webhook(&headers, body)),
    )
    .await
}

/// `GET /health`.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> Response {
    GateError::Protocol {
        kind: ProtocolErrorKind::NotFound {
            path: uri.path().to_string(),
        },
    }
    .into_response()
}

/// Per-IP rate limiting, applied before any signature or ledger work.
pub async fn rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(ConnectInfo(addr)) = connect_info {
        if !state.rate_limiter.check_and_record(addr.ip()) {
            warn!(client_ip = %addr.ip(), path = %request.uri().path(), "Rate limit exceeded");
            state.metrics.record_request(false);
            return GateError::RateLimited.into_response();
        }
    }

    next.run(request).await
}

async fn handle(
    state: &AppState,
    client_ip: Option<IpAddr>,
    endpoint: &'static str,
    request: Result<InboundRequest, BytesRejection>,
) -> Response {
    let _in_flight = state.metrics.track();
    let request_id = Uuid::new_v4();
    let received_at = Utc::now();
    let started = Instant::now();

    let (reply, idempotency_key, details) = match request {
        Ok(request) => {
            let reply = dispatch(state, request_id, &request, received_at).await;
            (reply, idempotency_key_of(&request), details_of(&request))
        }
        Err(rejection) => (ServiceReply::failure(body_error(&rejection)), None, Value::Null),
    };

    let accepted = reply.accepted();
    state.metrics.record_request(accepted);

    let entry = if accepted {
        AuditEntry::accepted(received_at, request_id, endpoint)
    } else {
        AuditEntry::rejected(received_at, request_id, endpoint, reply.reason_codes.clone())
    }
    .with_client_ip(client_ip)
    .with_http_status(reply.http_status())
    .with_idempotency_key(idempotency_key.as_deref().map(redact_idempotency_key))
    .with_replayed(reply.replayed)
    .with_details(details)
    .with_duration_ms(started.elapsed().as_millis() as u64);

    if let Err(e) = state.audit.log(&entry) {
        warn!(request_id = %request_id, error = %e, "Failed to write audit entry");
    }

    info!(
        request_id = %request_id,
        endpoint = endpoint,
        accepted = accepted,
        status = reply.http_status(),
        reasons = ?reply.reason_codes,
        duration_ms = entry.duration_ms,
        "Request handled"
    );

    render(request_id, reply)
}

async fn dispatch(
    state: &AppState,
    request_id: Uuid,
    request: &InboundRequest,
    now: DateTime<Utc>,
) -> ServiceReply {
    match request {
        InboundRequest::PaymentSubmission { headers, body } => {
            state.checkout.submit(request_id, headers, body, now).await
        }
        InboundRequest::ProviderWebhook {
            signature_header,
            body,
        } => {
            state
                .webhooks
                .receive(request_id, signature_header.as_deref(), body, now)
                .await
        }
    }
}

fn render(request_id: Uuid, reply: ServiceReply) -> Response {
    let mut response = match reply.disposition {
        Disposition::Outcome(outcome) => outcome_response(&outcome),
        Disposition::Failure(error) => ApiError::new(request_id, error).into_response(),
    };

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(HEADER_REQUEST_ID, value);
    }
    response
}

fn body_error(rejection: &BytesRejection) -> GateError {
    let kind = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ProtocolErrorKind::BodyTooLarge
    } else {
        ProtocolErrorKind::InvalidBody {
            message: rejection.body_text(),
        }
    };
    GateError::Protocol { kind }
}

fn idempotency_key_of(request: &InboundRequest) -> Option<String> {
    match request {
        InboundRequest::PaymentSubmission { headers, .. } => headers.idempotency_key.clone(),
        InboundRequest::ProviderWebhook { .. } => None,
    }
}

/// Audit details: a sanitized view of the submitted fields, or the event
/// identity of a webhook. Unparsable bodies contribute nothing.
fn details_of(request: &InboundRequest) -> Value {
    let parsed: Value = match serde_json::from_slice(request.body()) {
        Ok(value) => value,
        Err(_) => return Value::Null,
    };

    match request {
        InboundRequest::PaymentSubmission { .. } => sanitize_details(&parsed),
        InboundRequest::ProviderWebhook { .. } => json!({
            "event_id": parsed.get("id"),
            "event_type": parsed.get("type"),
        }),
    }
}
