//! Cache Module
//!
//! Stored responses, the storage and key-generation seams, and the freshness
//! rules that decide whether a stored response may be served.

mod directives;
mod entry;
mod freshness;
mod key;
mod stats;
mod store;


// Re-export public types
pub use directives::RequestDirectives;
pub use entry::{CacheEntry, CacheHit, CachedResponse};
pub use freshness::{evaluate, FreshnessDecision};
pub use key::{CacheKeyGenerator, QueryKeyGenerator};
pub use stats::{CacheMetrics, CacheStats};
pub use store::{CacheStore, MemoryStore};
