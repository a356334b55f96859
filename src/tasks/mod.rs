//! Background Tasks Module
//!
//! Contains work the cache runs outside the request that triggered it.
//!
//! # Tasks
//! - Refresh: re-executes stale requests, one in flight per cache key

mod refresh;

pub use refresh::{RefreshCoordinator, RefreshToken};
