//! Cache Entry Module
//!
//! Defines stored responses and the entries that wrap them with freshness metadata.

use axum::{
    body::{Body, Bytes},
    http::{response::Parts, HeaderMap, StatusCode, Version},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, TimeDelta, Utc};

// == Cache Hit Marker ==
/// Response extension marking a response that was produced from the cache.
///
/// The committer never stores a response carrying this marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHit;

// == Cached Response ==
/// A fully buffered response: everything needed to replay it byte for byte.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl CachedResponse {
    /// Creates a cached response from explicit parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            headers,
            body: body.into(),
        }
    }

    /// Captures the head of a live response together with its buffered body.
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers.clone(),
            body,
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.version_mut() = self.version;
        *response.headers_mut() = self.headers;
        response.extensions_mut().insert(CacheHit);
        response
    }
}

// == Cache Entry ==
/// A stored response located by its cache key.
///
/// Entries are immutable once stored; the cache replaces or removes them.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The key the entry is stored under
    pub key: String,
    /// The stored response
    pub response: CachedResponse,
    /// When the response was captured
    pub created: DateTime<Utc>,
    /// When the response stops being fresh
    pub expiration: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry captured now.
    pub fn new(key: impl Into<String>, response: CachedResponse, expiration: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            response,
            created: Utc::now(),
            expiration,
        }
    }

    // == Age ==
    /// Returns how long ago the response was captured, never negative.
    pub fn age_at(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.created).max(TimeDelta::zero())
    }
}
