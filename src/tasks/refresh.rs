//! Background Refresh Task
//!
//! Re-executes requests whose cached response went stale, at most one refresh
//! per key at a time.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{CacheMetrics, CacheStore};
use crate::middleware::{RequestExecutor, RequestSnapshot};

type InFlight = Arc<DashMap<String, ()>>;

// == Refresh Token ==
/// In-flight marker for one key. Dropping it frees the key for the next refresh.
#[derive(Debug)]
pub struct RefreshToken {
    key: String,
    in_flight: InFlight,
}

impl RefreshToken {
    /// Registers `key` as refreshing, or returns `None` if it already is.
    ///
    /// The membership check and the insert happen under one shard lock.
    fn acquire(in_flight: &InFlight, key: &str) -> Option<Self> {
        match in_flight.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(Self {
                    key: key.to_string(),
                    in_flight: Arc::clone(in_flight),
                })
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for RefreshToken {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

// == Refresh Coordinator ==
/// Single-flight scheduler for background refreshes.
///
/// Deduplication is per key; refreshes of different keys run concurrently, up
/// to `concurrency` at once. A concurrency of 1 serializes every refresh in the
/// process.
#[derive(Clone)]
pub struct RefreshCoordinator {
    in_flight: InFlight,
    permits: Arc<Semaphore>,
    store: Arc<dyn CacheStore>,
    metrics: Arc<CacheMetrics>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn CacheStore>, metrics: Arc<CacheMetrics>, concurrency: usize) -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            store,
            metrics,
        }
    }

    /// Whether a refresh for `key` is currently in flight.
    pub fn is_refreshing(&self, key: &str) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Number of keys currently refreshing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    // == Trigger ==
    /// Schedules a re-execution of `request` to refresh `key`.
    ///
    /// Returns `None` without doing anything when a refresh for `key` is
    /// already in flight. Otherwise spawns a task that waits for a worker
    /// permit, runs `executor`, and evicts the entry if the run fails or
    /// yields a non-success status. Failures are logged, never retried.
    pub fn trigger<E>(
        &self,
        key: String,
        request: RequestSnapshot,
        executor: E,
    ) -> Option<JoinHandle<()>>
    where
        E: RequestExecutor + 'static,
    {
        let Some(token) = RefreshToken::acquire(&self.in_flight, &key) else {
            self.metrics.record_refresh_deduplicated();
            debug!("Refresh of '{}' already in flight, skipping", key);
            return None;
        };

        self.metrics.record_refresh();
        let permits = Arc::clone(&self.permits);
        let store = Arc::clone(&self.store);
        let metrics = Arc::clone(&self.metrics);

        Some(tokio::spawn(async move {
            // The semaphore is never closed, but bail out cleanly if it ever is.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };

            debug!("Refreshing '{}' in the background", token.key());

            let outcome = AssertUnwindSafe(executor.execute(request))
                .catch_unwind()
                .await;

            let failure = match outcome {
                Ok(Ok(status)) if status.is_success() => None,
                Ok(Ok(status)) => Some(format!("status {}", status)),
                Ok(Err(err)) => Some(err.to_string()),
                Err(_) => Some("executor panicked".to_string()),
            };

            match failure {
                None => debug!("Refresh of '{}' completed", token.key()),
                Some(reason) => {
                    if store.remove(token.key()) {
                        metrics.record_removal();
                    }
                    metrics.record_refresh_failure();
                    warn!("Refresh of '{}' failed ({}), entry evicted", token.key(), reason);
                }
            }
        }))
    }
}
