//! Per-client rate limiting.
//!
//! Sliding window limiter keyed by client IP, applied before any signature
//! work so an unauthenticated flood cannot burn HMAC or ledger capacity.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A sliding window rate limiter that tracks requests per client address.
///
/// Each address can make at most `max_requests` within `window`.
pub struct RateLimiter {
    requests: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
    /// Maximum requests allowed per window
    max_requests: usize,
    /// Time window for rate limiting
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    ///
    /// * `max_requests` - Maximum requests allowed per window
    /// * `window_seconds` - Duration of the sliding window in seconds
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Record a request from `client` if it is under its limit.
    ///
    /// Returns `true` if the request is allowed, `false` if rate limited.
    /// A limit of zero disables limiting.
    pub fn check_and_record(&self, client: IpAddr) -> bool {
        if self.max_requests == 0 {
            return true;
        }

        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let entry = requests.entry(client).or_default();
        while entry
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.window)
        {
            entry.pop_front();
        }

        if entry.len() >= self.max_requests {
            return false;
        }

        entry.push_back(now);
        true
    }

    /// Drop addresses with no requests inside the window.
    pub fn cleanup(&self) {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        requests.retain(|_, times| {
            times.retain(|&t| now.duration_since(t) < self.window);
            !times.is_empty()
        });
    }

    /// Number of addresses being tracked.
    pub fn tracked_clients(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Spawn a task that calls [`cleanup`](Self::cleanup) every `interval`.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            loop {
                interval_timer.tick().await;
                limiter.cleanup();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::thread;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_rate_limiter_allows_under_limit() {
        let limiter = RateLimiter::new(5, 60);
        for _ in 0..5 {
            assert!(limiter.check_and_record(ip(1)));
        }
    }

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let limiter = RateLimiter::new(3, 60);

        assert!(limiter.check_and_record(ip(1)));
        assert!(limiter.check_and_record(ip(1)));
        assert!(limiter.check_and_record(ip(1)));

        assert!(!limiter.check_and_record(ip(1)));
    }

    #[test]
    fn test_rate_limiter_separate_clients() {
        let limiter = RateLimiter::new(2, 60);

        assert!(limiter.check_and_record(ip(1)));
        assert!(limiter.check_and_record(ip(1)));
        assert!(!limiter.check_and_record(ip(1)));

        assert!(limiter.check_and_record(ip(2)));
        assert!(limiter.check_and_record(ip(2)));
        assert!(!limiter.check_and_record(ip(2)));
    }

    #[test]
    fn test_zero_limit_disables() {
        let limiter = RateLimiter::new(0, 60);
        for _ in 0..100 {
            assert!(limiter.check_and_record(ip(1)));
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_rate_limiter_window_expiry() {
        let limiter = RateLimiter::new(2, 1);

        assert!(limiter.check_and_record(ip(1)));
        assert!(limiter.check_and_record(ip(1)));
        assert!(!limiter.check_and_record(ip(1)));

        thread::sleep(Duration::from_millis(1100));

        assert!(limiter.check_and_record(ip(1)));
    }

    #[test]
    fn test_rate_limiter_cleanup() {
        let limiter = RateLimiter::new(10, 1);

        limiter.check_and_record(ip(1));
        limiter.check_and_record(ip(2));
        limiter.check_and_record(ip(3));
        assert_eq!(limiter.tracked_clients(), 3);

        thread::sleep(Duration::from_millis(1100));

        limiter.cleanup();
        assert_eq!(limiter.tracked_clients(), 0);
    }
}
