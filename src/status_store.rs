//! # Status Store
//!
//! Concurrency-safe table of outstanding and recently-completed requests,
//! keyed by correlation id. Shared by the dispatcher (inserts), the reply
//! demultiplexer (transitions), the expiry sweeper (evictions), and external
//! status readers. All operations are atomic at single-entry granularity;
//! no cross-entry transactions exist or are needed.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::correlation::CorrelationId;
use crate::error::CourierError;

/// Lifecycle status of a request entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Dispatched to the request queue, no reply yet
    Processing,
    /// Reply received with a normal result
    Completed,
    /// Reply received carrying a worker-reported error
    Failed,
}

impl RequestStatus {
    /// Whether this status is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Processing)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Processing => write!(f, "Processing"),
            RequestStatus::Completed => write!(f, "Completed"),
            RequestStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// One outstanding or recently-completed request.
///
/// Invariants: a `Processing` entry has `result == None`; the entry
/// transitions Processing -> {Completed, Failed} exactly once and never
/// backward; `created_at` is set at insertion and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEntry {
    pub status: RequestStatus,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RequestEntry {
    /// Fresh entry as inserted by the dispatcher at submission time
    pub fn processing() -> Self {
        Self {
            status: RequestStatus::Processing,
            result: None,
            created_at: Utc::now(),
        }
    }

    /// Entry with a backdated creation time, for exercising expiry
    pub fn processing_since(created_at: DateTime<Utc>) -> Self {
        Self {
            status: RequestStatus::Processing,
            result: None,
            created_at,
        }
    }
}

/// Result of attempting a status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Entry was Processing and is now terminal
    Applied,
    /// Entry already reached a terminal state; nothing was changed
    AlreadyTerminal,
    /// No entry for this correlation id (never issued, or already evicted)
    NotFound,
}

/// Concurrent map from correlation id to request entry.
///
/// Backed by a sharded `DashMap`, so per-key operations are atomic under
/// concurrent invocation from submitters, the reply consumer, and the sweeper.
#[derive(Debug, Default)]
pub struct StatusStore {
    entries: DashMap<CorrelationId, RequestEntry>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Insert a new entry, failing on a duplicate correlation id.
    ///
    /// A collision is unreachable in practice given v4 uniqueness; surfacing
    /// it as an error keeps the one-live-entry-per-id invariant checkable.
    pub fn insert(&self, id: CorrelationId, entry: RequestEntry) -> Result<(), CourierError> {
        match self.entries.entry(id) {
            Entry::Occupied(_) => Err(CourierError::CorrelationCollision(id)),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Snapshot of the entry for a correlation id, if present
    pub fn get(&self, id: &CorrelationId) -> Option<RequestEntry> {
        self.entries.get(id).map(|entry| entry.clone())
    }

    /// Apply the single Processing -> terminal transition for an entry.
    ///
    /// A second reply for an already-terminal entry reports `AlreadyTerminal`
    /// and mutates nothing: duplicate broker deliveries are idempotently
    /// ignored rather than overwriting the recorded result.
    pub fn transition(
        &self,
        id: &CorrelationId,
        status: RequestStatus,
        result: String,
    ) -> TransitionOutcome {
        debug_assert!(status.is_terminal(), "transition target must be terminal");

        match self.entries.get_mut(id) {
            None => TransitionOutcome::NotFound,
            Some(mut entry) => {
                if entry.status.is_terminal() {
                    return TransitionOutcome::AlreadyTerminal;
                }
                entry.status = status;
                entry.result = Some(result);
                TransitionOutcome::Applied
            }
        }
    }

    /// Remove an entry outright (dispatch rollback)
    pub fn remove(&self, id: &CorrelationId) -> Option<RequestEntry> {
        self.entries.remove(id).map(|(_, entry)| entry)
    }

    /// Evict every entry older than `ttl`, regardless of status.
    ///
    /// Returns the number of evicted entries. Both completed and
    /// still-processing entries are subject to eviction; this bounds memory
    /// even when the broker never delivers a reply.
    pub fn sweep(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::max_value());
        let before = self.entries.len();
        self.entries.retain(|id, entry| {
            let keep = now - entry.created_at <= ttl;
            if !keep {
                debug!(correlation_id = %id, status = %entry.status, "Evicting expired entry");
            }
            keep
        });
        before.saturating_sub(self.entries.len())
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
