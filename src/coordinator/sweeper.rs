//! Periodic eviction of status entries older than the retention TTL.
//!
//! Age is measured from creation, so an entry still in Processing is evicted
//! on the same schedule as a settled one. A reply arriving after eviction is
//! indistinguishable from a reply for an unknown request and gets dropped by
//! the demultiplexer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::status_store::StatusStore;

/// Counters exposed for shutdown logging and tests
#[derive(Debug, Default)]
pub struct SweeperStats {
    pub cycles: AtomicU64,
    pub evicted: AtomicU64,
}

#[derive(Debug)]
pub struct ExpirySweeper {
    store: Arc<StatusStore>,
    ttl: Duration,
    sweep_interval: Duration,
    is_running: Arc<AtomicBool>,
    stats: Arc<SweeperStats>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<StatusStore>, ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            store,
            ttl,
            sweep_interval,
            is_running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(SweeperStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SweeperStats> {
        Arc::clone(&self.stats)
    }

    /// Spawn the background sweep loop. Idempotent per sweeper instance.
    pub fn start(&self) -> JoinHandle<()> {
        self.is_running.store(true, Ordering::Relaxed);

        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);
        let is_running = Arc::clone(&self.is_running);
        let ttl = self.ttl;
        let sweep_interval = self.sweep_interval;

        info!(
            ttl_secs = ttl.as_secs(),
            sweep_interval_secs = sweep_interval.as_secs(),
            "Expiry sweeper started"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            // First tick fires immediately; skip it so a fresh entry is never
            // inspected before the interval has elapsed once.
            interval.tick().await;

            while is_running.load(Ordering::Relaxed) {
                interval.tick().await;

                let evicted = store.sweep(Utc::now(), ttl);
                stats.cycles.fetch_add(1, Ordering::Relaxed);
                if evicted > 0 {
                    stats.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
                    debug!(evicted, remaining = store.len(), "Sweep evicted expired entries");
                }
            }

            debug!("Expiry sweeper stopped");
        })
    }

    pub fn stop(&self) {
        self.is_running.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::CorrelationId;
    use crate::status_store::RequestEntry;

    #[tokio::test]
    async fn test_sweeper_evicts_expired_entries() {
        let store = Arc::new(StatusStore::new());

        let stale = CorrelationId::mint();
        store
            .insert(
                stale,
                RequestEntry::processing_since(Utc::now() - chrono::Duration::seconds(10)),
            )
            .expect("insert stale");

        let fresh = CorrelationId::mint();
        store
            .insert(fresh, RequestEntry::processing())
            .expect("insert fresh");

        let sweeper = ExpirySweeper::new(
            store.clone(),
            Duration::from_secs(5),
            Duration::from_millis(20),
        );
        let stats = sweeper.stats();
        let handle = sweeper.start();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while stats.evicted.load(Ordering::Relaxed) == 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(store.get(&stale).is_none());
        assert!(store.get(&fresh).is_some());
        assert_eq!(stats.evicted.load(Ordering::Relaxed), 1);

        sweeper.stop();
        handle.abort();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_stopped_sweeper_leaves_entries_alone() {
        let store = Arc::new(StatusStore::new());
        let sweeper = ExpirySweeper::new(
            store.clone(),
            Duration::from_millis(1),
            Duration::from_millis(10),
        );
        let handle = sweeper.start();
        sweeper.stop();
        handle.abort();
        let _ = handle.await;

        let id = CorrelationId::mint();
        store
            .insert(
                id,
                RequestEntry::processing_since(Utc::now() - chrono::Duration::seconds(60)),
            )
            .expect("insert");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.get(&id).is_some());
    }
}
