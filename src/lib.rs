//! SWR Response Cache - HTTP response caching middleware
//!
//! Serves stored responses while they are fresh, keeps serving them after they
//! expire while a single background refresh replaces them, and honors the
//! request `Cache-Control` directives a client sends.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheEntry, CacheStore, FreshnessDecision, MemoryStore, QueryKeyGenerator};
pub use config::Config;
pub use error::{CacheError, Result};
pub use middleware::{
    Cacheable, PreRequirements, RequestExecutor, ResponseCache, ResponseCacheLayer,
};
