//! Cache Statistics Module
//!
//! Tracks cache performance metrics: hits, misses, stores and background refreshes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Cached responses released while fresh
    pub hits: u64,
    /// Expired responses released while a refresh was scheduled
    pub stale_hits: u64,
    /// Lookups that fell through to the handler
    pub misses: u64,
    /// Responses written to the store
    pub stores: u64,
    /// Entries removed after a failed or non-success response
    pub removals: u64,
    /// Background refreshes started
    pub refreshes: u64,
    /// Refresh triggers dropped because one was already in flight
    pub refreshes_deduplicated: u64,
    /// Background refreshes that failed or returned a non-success status
    pub refresh_failures: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate, counting stale hits as hits.
    ///
    /// Returns 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}

// == Cache Metrics ==
/// Lock-free counters shared by the interceptors and the refresh tasks.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    removals: AtomicU64,
    refreshes: AtomicU64,
    refreshes_deduplicated: AtomicU64,
    refresh_failures: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_hit(&self) {
        self.stale_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_deduplicated(&self) {
        self.refreshes_deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_failure(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the counters into a serializable snapshot.
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refreshes_deduplicated: self.refreshes_deduplicated.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            total_entries,
        }
    }
}
