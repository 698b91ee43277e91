//! Request counters for monitoring and shutdown draining.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Request metrics for monitoring.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    /// Total requests processed.
    pub requests_total: AtomicU64,
    /// Total rejected or failed requests.
    pub requests_failed: AtomicU64,
    /// Requests currently being handled.
    pub in_flight: AtomicUsize,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a finished request.
    pub fn record_request(&self, success: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Mark a request as in flight until the guard drops.
    pub fn track(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            metrics: Arc::clone(self),
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

/// Decrements the in-flight count on drop, including when the request is cancelled.
#[derive(Debug)]
pub struct InFlightGuard {
    metrics: Arc<RequestMetrics>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.metrics.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
