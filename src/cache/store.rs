//! Cache Store Module
//!
//! Key to entry persistence used by the response cache, plus the default
//! in-memory backend.

use dashmap::DashMap;

use crate::cache::CacheEntry;

// == Cache Store Trait ==
/// Pluggable storage backend.
///
/// Implementations must be safe to share across tasks; the cache adds no
/// locking of its own around these calls.
pub trait CacheStore: Send + Sync {
    /// Returns the entry stored under `key`, if any.
    ///
    /// Expired entries are still returned: deciding what to do with them is
    /// the freshness evaluator's job.
    fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Stores `entry` under its own key, replacing any previous entry.
    fn set(&self, entry: CacheEntry);

    /// Removes the entry stored under `key`. Returns whether one existed.
    fn remove(&self, key: &str) -> bool;

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Memory Store ==
/// In-process store backed by a sharded concurrent map.
///
/// Holds every entry until it is replaced or removed; there is no capacity
/// limit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, entry: CacheEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
