//! Route table and middleware stack.

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::http::HeaderValue;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{BoxError, Router};
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::ServerConfig;
use crate::error::{GateError, ProtocolErrorKind};

use super::handlers::{health, not_found, rate_limit, receive_webhook, submit_payment};
use super::state::AppState;

/// Build the gateway router.
///
/// Payment and webhook routes are rate limited per client address; the
/// health check is not. Every response carries the security headers.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let guarded = Router::new()
        .route("/api/payments", post(submit_payment))
        .route("/process-payment", post(submit_payment))
        .route("/webhooks/payments", post(receive_webhook))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .merge(guarded)
        .route("/health", get(health))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_seconds,
                ))),
        )
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}

async fn handle_middleware_error(err: BoxError) -> Response {
    if err.is::<Elapsed>() {
        return GateError::Protocol {
            kind: ProtocolErrorKind::Timeout,
        }
        .into_response();
    }

    error!(error = %err, "Unhandled middleware error");
    GateError::Server {
        message: err.to_string(),
    }
    .into_response()
}
