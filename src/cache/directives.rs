//! Request Cache-Control directives
//!
//! Thin adapter from the typed `Cache-Control` header to the directives the
//! cache acts on.

use std::time::Duration;

use axum::http::HeaderMap;
use headers::{CacheControl, HeaderMapExt};

// == Request Directives ==
/// Cache directives sent by the client with one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestDirectives {
    /// `no-cache`: never answer from the cache
    pub no_cache: bool,
    /// `no-store`: never store the response
    pub no_store: bool,
    /// `max-age`: oldest acceptable response
    pub max_age: Option<Duration>,
    /// `min-fresh`: how long the response must remain fresh
    pub min_fresh: Option<Duration>,
    /// `max-stale`: how far past expiration the client still accepts
    pub max_stale: Option<Duration>,
}

impl RequestDirectives {
    /// Reads the directives from request headers.
    ///
    /// A missing or unparsable `Cache-Control` header yields no directives.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .typed_get::<CacheControl>()
            .map(Self::from)
            .unwrap_or_default()
    }
}

impl From<CacheControl> for RequestDirectives {
    fn from(value: CacheControl) -> Self {
        Self {
            no_cache: value.no_cache(),
            no_store: value.no_store(),
            max_age: value.max_age(),
            min_fresh: value.min_fresh(),
            max_stale: value.max_stale(),
        }
    }
}
