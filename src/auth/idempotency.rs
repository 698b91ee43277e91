//! Idempotency ledger with at-most-once execution per key.
//!
//! Entries are keyed by `(scope, key)` so the same client token used for
//! two different logical operations never collides. An entry moves from
//! pending to resolved exactly once; resolved outcomes are replayed
//! verbatim until the retention horizon elapses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ring::digest;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{GateError, IdempotencyErrorKind};

/// Terminal status of a resolved entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Completed,
    Failed,
}

/// The stored result replayed to every retry of a resolved key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOutcome {
    pub status: OutcomeStatus,
    pub http_status: u16,
    pub body: serde_json::Value,
}

impl StoredOutcome {
    /// A successful outcome.
    pub fn completed(http_status: u16, body: serde_json::Value) -> Self {
        Self {
            status: OutcomeStatus::Completed,
            http_status,
            body,
        }
    }

    /// A terminal failure outcome.
    pub fn failed(http_status: u16, body: serde_json::Value) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            http_status,
            body,
        }
    }
}

/// Proof that the holder won `begin` for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    scope: String,
    key: String,
    token: Uuid,
    expires_at: Instant,
}

impl Lease {
    /// Time left before another caller may take the key over.
    ///
    /// Work done under the lease must finish within this budget.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// The operation scope this lease belongs to.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The idempotency key this lease guards.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Result of `begin`.
#[derive(Debug, Clone, PartialEq)]
pub enum Begin {
    /// First sight of the key (or a takeover of an abandoned lease): execute.
    Started(Lease),
    /// The key was already resolved: return this without executing.
    AlreadyCompleted(StoredOutcome),
    /// Another caller holds a live lease on this key.
    InFlight,
}

/// Injectable idempotency store.
///
/// `begin` must be a single atomic check-and-set per key.
pub trait IdempotencyStore: Send + Sync {
    /// Claim a key, or report why it cannot be claimed.
    ///
    /// `fingerprint` identifies the request payload; reusing a key with a
    /// different fingerprint fails with `Conflict`.
    fn begin(&self, scope: &str, key: &str, fingerprint: &str) -> Result<Begin, GateError>;

    /// Record a successful outcome for a leased key.
    fn complete(&self, lease: &Lease, outcome: StoredOutcome) -> Result<(), GateError>;

    /// Record a terminal failure for a leased key.
    fn fail(&self, lease: &Lease, outcome: StoredOutcome) -> Result<(), GateError>;

    /// Drop a pending lease without recording an outcome, so the key can be retried.
    fn release(&self, lease: &Lease);

    /// Evict expired entries. Returns the number removed.
    fn purge_expired(&self) -> usize;
}

#[derive(Debug)]
enum EntryState {
    Pending {
        token: Uuid,
        lease_expires: Instant,
    },
    Resolved {
        outcome: StoredOutcome,
        expires: Instant,
    },
}

#[derive(Debug)]
struct LedgerEntry {
    fingerprint: String,
    state: EntryState,
}

/// In-memory ledger backed by a sharded concurrent map.
///
/// Each key's check-and-set runs under its shard's write lock only, so
/// unrelated keys do not serialize behind one another.
pub struct InMemoryIdempotencyStore {
    entries: DashMap<(String, String), LedgerEntry>,
    lease: Duration,
    retention: Duration,
}

impl InMemoryIdempotencyStore {
    /// Create a new store.
    pub fn new(lease: Duration, retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            lease,
            retention,
        }
    }

    /// `begin` evaluated at an explicit instant.
    pub fn begin_at(
        &self,
        scope: &str,
        key: &str,
        fingerprint: &str,
        now: Instant,
    ) -> Result<Begin, GateError> {
        let map_key = (scope.to_string(), key.to_string());
        let lease_expires = now + self.lease;

        match self.entries.entry(map_key) {
            Entry::Vacant(vacant) => {
                let token = Uuid::new_v4();
                vacant.insert(LedgerEntry {
                    fingerprint: fingerprint.to_string(),
                    state: EntryState::Pending {
                        token,
                        lease_expires,
                    },
                });
                Ok(Begin::Started(self.lease_for(scope, key, token, lease_expires)))
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();

                // Past retention, or an abandoned lease: the key starts over
                // and the new request's payload becomes the reference.
                let reusable = match &entry.state {
                    EntryState::Resolved { expires, .. } => *expires <= now,
                    EntryState::Pending { lease_expires, .. } => *lease_expires <= now,
                };
                if reusable {
                    if matches!(entry.state, EntryState::Pending { .. }) {
                        warn!(scope, "Taking over abandoned idempotency lease");
                    }
                    let token = Uuid::new_v4();
                    *entry = LedgerEntry {
                        fingerprint: fingerprint.to_string(),
                        state: EntryState::Pending {
                            token,
                            lease_expires,
                        },
                    };
                    return Ok(Begin::Started(self.lease_for(scope, key, token, lease_expires)));
                }

                if entry.fingerprint != fingerprint {
                    return Err(IdempotencyErrorKind::Conflict.into());
                }

                match &entry.state {
                    EntryState::Resolved { outcome, .. } => {
                        Ok(Begin::AlreadyCompleted(outcome.clone()))
                    }
                    EntryState::Pending { .. } => Ok(Begin::InFlight),
                }
            }
        }
    }

    /// Resolve a lease at an explicit instant.
    pub fn resolve_at(
        &self,
        lease: &Lease,
        outcome: StoredOutcome,
        now: Instant,
    ) -> Result<(), GateError> {
        let map_key = (lease.scope.clone(), lease.key.clone());
        let mut entry = self
            .entries
            .get_mut(&map_key)
            .ok_or(GateError::Idempotency {
                kind: IdempotencyErrorKind::LeaseLost,
            })?;

        let holds_lease = matches!(
            entry.state,
            EntryState::Pending { token, .. } if token == lease.token
        );
        if !holds_lease {
            return Err(GateError::Idempotency {
                kind: IdempotencyErrorKind::LeaseLost,
            });
        }

        entry.state = EntryState::Resolved {
            outcome,
            expires: now + self.retention,
        };
        Ok(())
    }

    /// Purge at an explicit instant.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| match entry.state {
            EntryState::Pending { lease_expires, .. } => lease_expires > now,
            EntryState::Resolved { expires, .. } => expires > now,
        });
        before.saturating_sub(self.entries.len())
    }

    /// Number of tracked entries (for monitoring).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start a background purge task.
    ///
    /// This spawns a tokio task that periodically evicts expired entries.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            loop {
                interval_timer.tick().await;
                let removed = store.purge_expired();
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "Purged idempotency entries");
                }
            }
        });
    }

    fn lease_for(&self, scope: &str, key: &str, token: Uuid, expires_at: Instant) -> Lease {
        Lease {
            scope: scope.to_string(),
            key: key.to_string(),
            token,
            expires_at,
        }
    }
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    fn begin(&self, scope: &str, key: &str, fingerprint: &str) -> Result<Begin, GateError> {
        self.begin_at(scope, key, fingerprint, Instant::now())
    }

    fn complete(&self, lease: &Lease, outcome: StoredOutcome) -> Result<(), GateError> {
        debug_assert_eq!(outcome.status, OutcomeStatus::Completed);
        self.resolve_at(lease, outcome, Instant::now())
    }

    fn fail(&self, lease: &Lease, outcome: StoredOutcome) -> Result<(), GateError> {
        debug_assert_eq!(outcome.status, OutcomeStatus::Failed);
        self.resolve_at(lease, outcome, Instant::now())
    }

    fn release(&self, lease: &Lease) {
        let map_key = (lease.scope.clone(), lease.key.clone());
        self.entries.remove_if(&map_key, |_, entry| {
            matches!(entry.state, EntryState::Pending { token, .. } if token == lease.token)
        });
    }

    fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }
}

/// Releases a pending lease if dropped before it is resolved.
///
/// A handler cancelled between `begin` and `complete`/`fail` would otherwise
/// block retries of the key until the lease expires.
pub struct LeaseGuard {
    store: Arc<dyn IdempotencyStore>,
    lease: Option<Lease>,
}

impl LeaseGuard {
    /// Guard a freshly started lease.
    pub fn new(store: Arc<dyn IdempotencyStore>, lease: Lease) -> Self {
        Self {
            store,
            lease: Some(lease),
        }
    }

    /// Record success and disarm.
    pub fn complete(mut self, outcome: StoredOutcome) -> Result<(), GateError> {
        match self.lease.take() {
            Some(lease) => self.store.complete(&lease, outcome),
            None => Ok(()),
        }
    }

    /// Record a terminal failure and disarm.
    pub fn fail(mut self, outcome: StoredOutcome) -> Result<(), GateError> {
        match self.lease.take() {
            Some(lease) => self.store.fail(&lease, outcome),
            None => Ok(()),
        }
    }

    /// Free the key for a retry and disarm.
    pub fn release(mut self) {
        if let Some(lease) = self.lease.take() {
            self.store.release(&lease);
        }
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            warn!(scope = lease.scope(), "Idempotency lease dropped unresolved, releasing");
            self.store.release(&lease);
        }
    }
}

/// SHA-256 fingerprint of a request body, hex-encoded.
pub fn fingerprint(body: &[u8]) -> String {
    hex::encode(digest::digest(&digest::SHA256, body).as_ref())
}
