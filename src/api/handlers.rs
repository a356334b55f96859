//! API Handlers
//!
//! HTTP request handlers for the admin endpoints and the cached demo content.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::middleware::{
    expiration_after, format_expiration, Cacheable, ResponseCache, CACHE_EXPIRES_HEADER,
};
use crate::models::{HealthResponse, PurgeRequest, PurgeResponse, StatsResponse, TimeResponse};

/// Application state shared across all handlers.
///
/// The response cache is shared with the [`ResponseCacheLayer`] wrapping the
/// content routes, so the admin endpoints see the same store and counters.
///
/// [`ResponseCacheLayer`]: crate::middleware::ResponseCacheLayer
#[derive(Clone)]
pub struct AppState {
    /// The response cache
    pub cache: Arc<ResponseCache>,
    /// Lifetime given to demo responses
    pub default_ttl: Duration,
    /// Number of times a demo handler actually rendered
    pub renders: Arc<AtomicU64>,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: Arc<ResponseCache>, default_ttl: Duration) -> Self {
        Self {
            cache,
            default_ttl,
            renders: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(ResponseCache::from_config(config)),
            Duration::from_secs(config.default_ttl),
        )
    }

    fn next_render(&self) -> u64 {
        self.renders.fetch_add(1, Ordering::SeqCst) + 1
    }
}

// == Admin ==
/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(stats, state.cache.refresher().in_flight()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for DELETE /cache?key=...
///
/// Drops one cached response so the next request renders it again.
pub async fn purge_handler(
    State(state): State<AppState>,
    Query(req): Query<PurgeRequest>,
) -> Result<Json<PurgeResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    if !state.cache.purge(&req.key) {
        return Err(CacheError::NotFound(req.key));
    }

    Ok(Json(PurgeResponse::new(req.key)))
}

// == Content ==
/// Handler for GET /time
///
/// Marked cacheable through the response extension.
pub async fn time_handler(State(state): State<AppState>) -> Cacheable<Json<TimeResponse>> {
    let render = state.next_render();
    Cacheable::for_duration(Json(TimeResponse::new(render)), state.default_ttl)
}

/// Handler for GET /greeting/:name
///
/// Marked cacheable through the expiration header, which never reaches the client.
pub async fn greeting_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let render = state.next_render();
    let expires = format_expiration(expiration_after(state.default_ttl));

    (
        [(CACHE_EXPIRES_HEADER, expires)],
        Json(json!({
            "greeting": format!("Hello, {}!", name),
            "render": render,
        })),
    )
}
