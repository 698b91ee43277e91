//! TCP listener with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::GateError;

use super::metrics::RequestMetrics;
use super::router::build_router;
use super::state::AppState;

/// HTTP server for the gateway.
pub struct GateServer {
    listener: TcpListener,
    router: Router,
    metrics: Arc<RequestMetrics>,
}

impl GateServer {
    /// Bind the configured address.
    pub async fn bind(config: &ServerConfig, state: AppState) -> Result<Self, GateError> {
        let listener = TcpListener::bind(config.bind_address)
            .await
            .map_err(|e| GateError::Server {
                message: format!("Failed to bind to {}: {}", config.bind_address, e),
            })?;

        let metrics = Arc::clone(&state.metrics);
        let router = build_router(state, config);

        info!(address = %config.bind_address, "Listener bound");

        Ok(Self {
            listener,
            router,
            metrics,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, GateError> {
        Ok(self.listener.local_addr()?)
    }

    /// Get request metrics.
    pub fn metrics(&self) -> Arc<RequestMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Serve until `shutdown` is notified.
    ///
    /// New connections stop being accepted on shutdown; requests already
    /// in flight run to completion.
    pub async fn run(self, shutdown: Arc<Notify>) -> Result<(), GateError> {
        info!("Listener running, waiting for requests...");

        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await
        .map_err(|e| GateError::Server {
            message: format!("Server error: {}", e),
        })?;

        info!("Listener stopped");
        Ok(())
    }
}

/// Wait for all in-flight requests to drain.
///
/// Returns immediately if nothing is in flight.
pub async fn wait_for_drain(metrics: &RequestMetrics) {
    let poll_interval = Duration::from_millis(100);

    while metrics.active() > 0 {
        debug!(active = metrics.active(), "Waiting for requests to drain");
        tokio::time::sleep(poll_interval).await;
    }

    info!("All requests drained");
}
