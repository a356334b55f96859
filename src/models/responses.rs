//! Response DTOs for the admin and demo API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the purge operation (DELETE /cache)
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    /// Success message
    pub message: String,
    /// The key that was purged
    pub key: String,
}

impl PurgeResponse {
    /// Creates a new PurgeResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' purged successfully", key),
            key,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Raw counters
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Share of lookups answered from the cache, stale hits included
    pub hit_rate: f64,
    /// Keys with a background refresh running
    pub refreshing: usize,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: CacheStats, refreshing: usize) -> Self {
        let hit_rate = stats.hit_rate();
        Self {
            stats,
            hit_rate,
            refreshing,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the demo time endpoint (GET /time)
#[derive(Debug, Clone, Serialize)]
pub struct TimeResponse {
    /// When the response was rendered
    pub rendered_at: String,
    /// How many times the handler has run
    pub render: u64,
}

impl TimeResponse {
    pub fn new(render: u64) -> Self {
        Self {
            rendered_at: chrono::Utc::now().to_rfc3339(),
            render,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
