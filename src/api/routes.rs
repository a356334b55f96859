//! API Routes
//!
//! Configures the Axum router: admin endpoints plus content routes wrapped by
//! the response cache layer.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    greeting_handler, health_handler, purge_handler, stats_handler, time_handler, AppState,
};
use crate::middleware::ResponseCacheLayer;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /time` - Cached demo content, marked by extension
/// - `GET /greeting/:name` - Cached demo content, marked by header
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
/// - `DELETE /cache?key=...` - Drop one cached response
///
/// # Middleware
/// - Response cache: content routes only, admin routes always run live
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let content = Router::new()
        .route("/time", get(time_handler))
        .route("/greeting/:name", get(greeting_handler))
        .layer(ResponseCacheLayer::new(state.cache.clone()));

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/cache", delete(purge_handler))
        .merge(content)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
