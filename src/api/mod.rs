//! API Module
//!
//! HTTP handlers and routing for the cache server.
//!
//! # Endpoints
//! - `GET /time` - Cached demo content
//! - `GET /greeting/:name` - Cached demo content
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint
//! - `DELETE /cache?key=...` - Purge a cached response

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
