//! Replayable request heads
//!
//! Cacheable requests are identified and replayed by their head alone, so the
//! cache works with a cloneable snapshot instead of the live request.

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, Uri, Version},
};

// == Cache Mode ==
/// Whether the interceptor may answer a request from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Normal operation
    #[default]
    Enabled,
    /// Background re-execution: the cache must not short-circuit the handler
    Disabled,
}

// == Request Snapshot ==
/// Method, URI, version and headers of a request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

impl RequestSnapshot {
    /// Copies the head of a live request.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
        }
    }

    /// Shorthand for a header-less `GET`, mostly useful in tests.
    pub fn get(uri: &str) -> Self {
        Self {
            method: Method::GET,
            uri: uri.parse().unwrap_or_default(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
        }
    }

    /// Rebuilds a request with an empty body for replay.
    pub fn to_request(&self) -> Request<Body> {
        let mut request = Request::new(Body::empty());
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        request
    }
}
