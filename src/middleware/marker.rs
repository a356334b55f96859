//! Cacheability markers
//!
//! A handler opts a response into caching either by wrapping it in
//! [`Cacheable`] or by setting the [`CACHE_EXPIRES_HEADER`] side-channel header
//! to an RFC 3339 timestamp. The header never leaves the server.

use std::time::Duration;

use axum::{
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use crate::error::{CacheError, Result};

/// Side-channel header carrying the expiration of a cacheable response.
pub const CACHE_EXPIRES_HEADER: HeaderName = HeaderName::from_static("x-cache-expires");

/// Diagnostic header telling clients whether a response came from the cache.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");

// == Cache Expiration ==
/// Response extension set by [`Cacheable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheExpiration(pub DateTime<Utc>);

// == Cacheable ==
/// Wraps any response and marks it cacheable until `expiration`.
#[derive(Debug, Clone)]
pub struct Cacheable<T> {
    inner: T,
    expiration: DateTime<Utc>,
}

impl<T> Cacheable<T> {
    pub fn new(inner: T, expiration: DateTime<Utc>) -> Self {
        Self { inner, expiration }
    }

    /// Marks `inner` cacheable for `ttl` from now.
    pub fn for_duration(inner: T, ttl: Duration) -> Self {
        Self::new(inner, expiration_after(ttl))
    }
}

impl<T: IntoResponse> IntoResponse for Cacheable<T> {
    fn into_response(self) -> Response {
        let mut response = self.inner.into_response();
        response
            .extensions_mut()
            .insert(CacheExpiration(self.expiration));
        response
    }
}

/// Returns now + `ttl`, saturating at the largest representable instant.
pub fn expiration_after(ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Formats `expiration` for the side-channel header.
pub fn format_expiration(expiration: DateTime<Utc>) -> HeaderValue {
    let formatted = expiration.to_rfc3339_opts(SecondsFormat::Secs, true);
    // RFC 3339 output is plain ASCII
    HeaderValue::from_str(&formatted).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Parses a side-channel header value.
pub fn parse_expiration(value: &HeaderValue) -> Result<DateTime<Utc>> {
    let text = value
        .to_str()
        .map_err(|_| CacheError::InvalidExpiration("non-ASCII header value".to_string()))?;

    DateTime::parse_from_rfc3339(text.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| CacheError::InvalidExpiration(format!("{}: {}", text, err)))
}
