//! Middleware Module
//!
//! Hooks the response cache into a tower service stack.

mod cache;
mod hooks;
mod layer;
mod marker;
mod request;

pub use cache::ResponseCache;
pub use hooks::{PreRequirements, RequestExecutor, RequireHeader};
pub use layer::{ResponseCacheLayer, ResponseCacheService};
pub use marker::{
    expiration_after, format_expiration, parse_expiration, CacheExpiration, Cacheable,
    CACHE_EXPIRES_HEADER, CACHE_STATUS_HEADER,
};
pub use request::{CacheMode, RequestSnapshot};
