//! Replay-window enforcement on claimed request timestamps.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::AuthErrorKind;

/// Numeric timestamps at or above this value are milliseconds, not seconds.
/// 10^11 seconds is roughly the year 5138; 10^11 milliseconds is 1973.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Bounded freshness window, symmetric around the local clock.
///
/// Timestamps in the future are tolerated up to the same bound to absorb
/// clock skew; anything further out is treated exactly like a stale request.
#[derive(Debug, Clone, Copy)]
pub struct ReplayWindow {
    window: Duration,
}

impl ReplayWindow {
    /// Create a new window of the given width (each direction).
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Width of the window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check a raw header value against `now`.
    pub fn check(&self, claimed: Option<&str>, now: DateTime<Utc>) -> Result<(), AuthErrorKind> {
        let claimed = claimed
            .and_then(parse_timestamp)
            .ok_or(AuthErrorKind::MissingTimestamp)?;
        self.check_instant(claimed, now)
    }

    /// Check a timestamp expressed in whole unix seconds.
    pub fn check_unix_seconds(&self, claimed: i64, now: DateTime<Utc>) -> Result<(), AuthErrorKind> {
        let claimed = DateTime::from_timestamp(claimed, 0).ok_or(AuthErrorKind::MissingTimestamp)?;
        self.check_instant(claimed, now)
    }

    fn check_instant(&self, claimed: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AuthErrorKind> {
        let skew_ms = now
            .signed_duration_since(claimed)
            .num_milliseconds()
            .unsigned_abs();

        if u128::from(skew_ms) > self.window.as_millis() {
            return Err(AuthErrorKind::StaleRequest {
                skew_seconds: skew_ms / 1000,
            });
        }

        Ok(())
    }
}

/// Parse a claimed timestamp.
///
/// Accepts unix seconds, unix milliseconds, or RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        let value: i64 = raw.parse().ok()?;
        return if value >= MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(value)
        } else {
            DateTime::from_timestamp(value, 0)
        };
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
