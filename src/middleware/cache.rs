//! Response cache service
//!
//! Owns the store, key generator, pre-requirements hook and refresh
//! coordinator, and implements the two interception points: the request
//! interceptor that may answer from the cache, and the response committer that
//! may capture a response into it.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    http::{header::AGE, response::Parts, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::{
    evaluate, CacheEntry, CacheHit, CacheKeyGenerator, CacheMetrics, CacheStats, CacheStore,
    CachedResponse, FreshnessDecision, MemoryStore, QueryKeyGenerator, RequestDirectives,
};
use crate::config::Config;
use crate::error::CacheError;
use crate::middleware::marker::{parse_expiration, CacheExpiration};
use crate::middleware::{
    CacheMode, PreRequirements, RequestExecutor, RequestSnapshot, CACHE_EXPIRES_HEADER,
    CACHE_STATUS_HEADER,
};
use crate::tasks::RefreshCoordinator;

/// Default refresh worker count.
const DEFAULT_REFRESH_CONCURRENCY: usize = 4;

/// Default largest body the committer stores.
const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

// == Response Cache ==
/// The cache service object shared by every request through an `Arc`.
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    keys: Arc<dyn CacheKeyGenerator>,
    pre_requirements: Option<Arc<dyn PreRequirements>>,
    refresher: RefreshCoordinator,
    metrics: Arc<CacheMetrics>,
    max_body_size: usize,
}

impl ResponseCache {
    // == Constructors ==
    pub fn new(store: Arc<dyn CacheStore>, keys: Arc<dyn CacheKeyGenerator>) -> Self {
        let metrics = Arc::new(CacheMetrics::new());
        let refresher =
            RefreshCoordinator::new(store.clone(), metrics.clone(), DEFAULT_REFRESH_CONCURRENCY);

        Self {
            store,
            keys,
            pre_requirements: None,
            refresher,
            metrics,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Builds an in-memory cache keyed by the configured vary parameters.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(QueryKeyGenerator::new(config.vary_params.clone())),
        )
        .with_max_body_size(config.max_body_size)
        .with_refresh_concurrency(config.refresh_concurrency)
    }

    /// Runs `hook` before any cached response is released.
    pub fn with_pre_requirements(mut self, hook: Arc<dyn PreRequirements>) -> Self {
        self.pre_requirements = Some(hook);
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    pub fn with_refresh_concurrency(mut self, concurrency: usize) -> Self {
        self.refresher =
            RefreshCoordinator::new(self.store.clone(), self.metrics.clone(), concurrency);
        self
    }

    // == Accessors ==
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.store.len())
    }

    /// Drops the entry stored under `key`. Returns whether one existed.
    pub fn purge(&self, key: &str) -> bool {
        let removed = self.store.remove(key);
        if removed {
            self.metrics.record_removal();
            debug!("Purged '{}'", key);
        }
        removed
    }

    /// Cache key for `request`, with empty keys folded into `None`.
    pub fn key_for(&self, request: &RequestSnapshot) -> Option<String> {
        self.keys.generate(request).filter(|key| !key.is_empty())
    }

    // == Decide ==
    /// Looks the request up and evaluates the entry found, without side effects.
    pub fn decide(
        &self,
        request: &RequestSnapshot,
        mode: CacheMode,
        now: DateTime<Utc>,
    ) -> (FreshnessDecision, Option<CacheEntry>) {
        if mode == CacheMode::Disabled {
            return (FreshnessDecision::Bypass, None);
        }

        let directives = RequestDirectives::from_headers(&request.headers);
        let Some(key) = self.key_for(request) else {
            return (FreshnessDecision::Bypass, None);
        };

        let entry = self.store.get(&key);
        let decision = evaluate(&directives, entry.as_ref(), now);
        (decision, entry)
    }

    // == On Request ==
    /// Inbound hook: returns a response to send instead of running the handler.
    ///
    /// A stale entry without a `max-stale` bound is still served, after one
    /// background refresh through `executor` has been scheduled. Either way the
    /// pre-requirements hook runs first and its response, if any, wins.
    pub async fn on_request<E>(
        &self,
        request: &RequestSnapshot,
        mode: CacheMode,
        executor: &E,
    ) -> Option<Response>
    where
        E: RequestExecutor + Clone + 'static,
    {
        let now = Utc::now();
        let (decision, entry) = self.decide(request, mode, now);

        let entry = match (decision, entry) {
            (FreshnessDecision::ServeCached, Some(entry)) => {
                self.metrics.record_hit();
                entry
            }
            (FreshnessDecision::ServeCachedAfterRefreshTrigger, Some(entry)) => {
                self.metrics.record_stale_hit();
                debug!("Serving stale '{}' while it refreshes", entry.key);
                self.refresher
                    .trigger(entry.key.clone(), request.clone(), executor.clone());
                entry
            }
            (FreshnessDecision::Bypass, _) => return None,
            _ => {
                self.metrics.record_miss();
                return None;
            }
        };

        if let Some(hook) = &self.pre_requirements {
            if let Some(veto) = hook.run(request).await {
                debug!("Pre-requirements withheld cached '{}'", entry.key);
                return Some(veto);
            }
        }

        Some(release(entry, decision, now))
    }

    // == On Response ==
    /// Outbound hook: captures `response` into the store when it is marked
    /// cacheable, and returns what should be transmitted.
    ///
    /// A marked response with a non-success status evicts the key instead.
    /// Bodies without a known size within the limit are sent but not stored.
    /// A body that fails while being buffered is lost, so the client receives
    /// [`CacheError::Body`] in its place.
    pub async fn on_response(&self, request: &RequestSnapshot, response: Response) -> Response {
        let (mut parts, body) = response.into_parts();
        let header_expiration = parts.headers.remove(CACHE_EXPIRES_HEADER);

        if parts.extensions.get::<CacheHit>().is_some() {
            return Response::from_parts(parts, body);
        }

        if RequestDirectives::from_headers(&request.headers).no_store {
            return Response::from_parts(parts, body);
        }

        let Some(key) = self.key_for(request) else {
            return Response::from_parts(parts, body);
        };

        let Some(expiration) = marked_expiration(&parts, header_expiration.as_ref()) else {
            return Response::from_parts(parts, body);
        };

        if !parts.status.is_success() {
            if self.store.remove(&key) {
                self.metrics.record_removal();
                debug!("Status {} evicted cached '{}'", parts.status, key);
            }
            return Response::from_parts(parts, body);
        }

        // Unknown or oversized bodies stream through untouched
        let fits = body
            .size_hint()
            .upper()
            .is_some_and(|upper| upper <= self.max_body_size as u64);
        if !fits {
            debug!(
                "Response for '{}' may exceed the {} byte limit; not cached",
                key, self.max_body_size
            );
            return Response::from_parts(parts, body);
        }

        let bytes = match axum::body::to_bytes(body, self.max_body_size).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Could not buffer response for '{}': {}", key, err);
                return CacheError::Body(err.to_string()).into_response();
            }
        };

        let cached = CachedResponse::from_parts(&parts, bytes.clone());
        self.store.set(CacheEntry::new(key, cached, expiration));
        self.metrics.record_store();

        Response::from_parts(parts, Body::from(bytes))
    }
}

/// Expiration of a response marked cacheable, structurally or by header.
fn marked_expiration(parts: &Parts, header: Option<&HeaderValue>) -> Option<DateTime<Utc>> {
    if let Some(CacheExpiration(expiration)) = parts.extensions.get::<CacheExpiration>() {
        return Some(*expiration);
    }

    match parse_expiration(header?) {
        Ok(expiration) => Some(expiration),
        Err(err) => {
            warn!("Ignoring cache marker: {}", err);
            None
        }
    }
}

/// Turns an entry into the response sent to the client.
fn release(entry: CacheEntry, decision: FreshnessDecision, now: DateTime<Utc>) -> Response {
    let age = entry.age_at(now).num_seconds();
    let status = match decision {
        FreshnessDecision::ServeCachedAfterRefreshTrigger => "STALE",
        _ => "HIT",
    };

    let mut response = entry.response.into_response();
    let headers = response.headers_mut();
    headers.insert(AGE, HeaderValue::from(age));
    headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Cacheable, RequireHeader};
    use crate::error::Result;
    use async_trait::async_trait;
    use axum::http::{
        header::{AUTHORIZATION, CACHE_CONTROL},
        HeaderMap, StatusCode,
    };
    use chrono::TimeDelta;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingExecutor {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RequestExecutor for CountingExecutor {
        async fn execute(&self, _request: RequestSnapshot) -> Result<StatusCode> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StatusCode::OK)
        }
    }

    fn cache() -> ResponseCache {
        ResponseCache::new(
            Arc::new(MemoryStore::new()),
            Arc::new(QueryKeyGenerator::default()),
        )
    }

    fn seed(cache: &ResponseCache, key: &str, age_secs: i64, lifetime_secs: i64) {
        let created = Utc::now() - TimeDelta::seconds(age_secs);
        cache.store().set(CacheEntry {
            key: key.to_string(),
            response: CachedResponse::new(StatusCode::OK, HeaderMap::new(), "cached"),
            created,
            expiration: created + TimeDelta::seconds(lifetime_secs),
        });
    }

    fn with_cache_control(mut request: RequestSnapshot, value: &'static str) -> RequestSnapshot {
        request
            .headers
            .insert(CACHE_CONTROL, HeaderValue::from_static(value));
        request
    }

    async fn body_of(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_fresh_hit_is_served() {
        let cache = cache();
        seed(&cache, "GET /report", 10, 60);
        let executor = CountingExecutor::default();

        let response = cache
            .on_request(&RequestSnapshot::get("/report"), CacheMode::Enabled, &executor)
            .await
            .unwrap();

        assert_eq!(response.headers()[CACHE_STATUS_HEADER], "HIT");
        assert!(response.headers().contains_key(AGE));
        assert_eq!(body_of(response).await, b"cached");
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_disabled_mode_bypasses() {
        let cache = cache();
        seed(&cache, "GET /report", 10, 60);
        let executor = CountingExecutor::default();

        let response = cache
            .on_request(&RequestSnapshot::get("/report"), CacheMode::Disabled, &executor)
            .await;

        assert!(response.is_none());
        assert_eq!(cache.stats().misses, 0);
    }

    #[tokio::test]
    async fn test_uncacheable_request_bypasses() {
        let cache = cache();
        let mut request = RequestSnapshot::get("/report");
        request.method = axum::http::Method::POST;

        let (decision, entry) = cache.decide(&request, CacheMode::Enabled, Utc::now());
        assert_eq!(decision, FreshnessDecision::Bypass);
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn test_empty_key_is_uncacheable() {
        let cache = ResponseCache::new(
            Arc::new(MemoryStore::new()),
            Arc::new(|_: &RequestSnapshot| Some(String::new())),
        );
        assert!(cache.key_for(&RequestSnapshot::get("/report")).is_none());
    }

    #[tokio::test]
    async fn test_stale_hit_serves_and_triggers_one_refresh() {
        let cache = cache();
        seed(&cache, "GET /report", 61, 60);
        let executor = CountingExecutor::default();

        let response = cache
            .on_request(&RequestSnapshot::get("/report"), CacheMode::Enabled, &executor)
            .await
            .unwrap();

        assert_eq!(response.headers()[CACHE_STATUS_HEADER], "STALE");
        assert_eq!(body_of(response).await, b"cached");
        assert_eq!(cache.stats().stale_hits, 1);
        assert_eq!(cache.stats().refreshes, 1);
    }

    #[tokio::test]
    async fn test_max_stale_extends_window() {
        let cache = cache();
        seed(&cache, "GET /report", 61, 60);
        let executor = CountingExecutor::default();
        let request = with_cache_control(RequestSnapshot::get("/report"), "max-stale=30");

        let response = cache
            .on_request(&request, CacheMode::Enabled, &executor)
            .await
            .unwrap();

        assert_eq!(response.headers()[CACHE_STATUS_HEADER], "HIT");
        assert_eq!(cache.stats().refreshes, 0);
    }

    #[tokio::test]
    async fn test_zero_max_stale_rejects_expired() {
        let cache = cache();
        seed(&cache, "GET /report", 61, 60);
        let executor = CountingExecutor::default();
        let request = with_cache_control(RequestSnapshot::get("/report"), "max-stale=0");

        let response = cache.on_request(&request, CacheMode::Enabled, &executor).await;

        assert!(response.is_none());
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pre_requirements_veto_wins() {
        let cache = cache().with_pre_requirements(Arc::new(RequireHeader::new(AUTHORIZATION)));
        seed(&cache, "GET /report", 10, 60);
        let executor = CountingExecutor::default();

        let response = cache
            .on_request(&RequestSnapshot::get("/report"), CacheMode::Enabled, &executor)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut authorized = RequestSnapshot::get("/report");
        authorized
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer ok"));
        let response = cache
            .on_request(&authorized, CacheMode::Enabled, &executor)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, b"cached");
    }

    #[tokio::test]
    async fn test_pre_requirements_veto_stale_hit_still_refreshes() {
        let cache = cache().with_pre_requirements(Arc::new(RequireHeader::new(AUTHORIZATION)));
        seed(&cache, "GET /report", 61, 60);
        let executor = CountingExecutor::default();

        let response = cache
            .on_request(&RequestSnapshot::get("/report"), CacheMode::Enabled, &executor)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(CACHE_STATUS_HEADER).is_none());
        assert_eq!(cache.stats().stale_hits, 1);
        assert_eq!(cache.stats().refreshes, 1);
    }

    #[tokio::test]
    async fn test_commit_stores_cacheable_response() {
        let cache = cache();
        let request = RequestSnapshot::get("/report");
        let expiration = Utc::now() + TimeDelta::seconds(60);

        let response = cache
            .on_response(&request, Cacheable::new("fresh", expiration).into_response())
            .await;
        assert_eq!(body_of(response).await, b"fresh");

        let entry = cache.store().get("GET /report").unwrap();
        assert_eq!(entry.expiration, expiration);
        assert_eq!(&entry.response.body()[..], b"fresh");

        // Immediately readable as a fresh hit with the same bytes
        let executor = CountingExecutor::default();
        let hit = cache
            .on_request(&request, CacheMode::Enabled, &executor)
            .await
            .unwrap();
        assert_eq!(body_of(hit).await, b"fresh");
    }

    #[tokio::test]
    async fn test_commit_via_header_strips_it() {
        let cache = cache();
        let request = RequestSnapshot::get("/greeting");
        let mut response = "hello".into_response();
        response.headers_mut().insert(
            CACHE_EXPIRES_HEADER,
            HeaderValue::from_static("2099-01-01T00:00:00Z"),
        );

        let response = cache.on_response(&request, response).await;

        assert!(!response.headers().contains_key(CACHE_EXPIRES_HEADER));
        assert!(cache.store().get("GET /greeting").is_some());
    }

    #[tokio::test]
    async fn test_unparsable_header_is_not_cached_but_stripped() {
        let cache = cache();
        let mut response = "hello".into_response();
        response
            .headers_mut()
            .insert(CACHE_EXPIRES_HEADER, HeaderValue::from_static("soon"));

        let response = cache
            .on_response(&RequestSnapshot::get("/greeting"), response)
            .await;

        assert!(!response.headers().contains_key(CACHE_EXPIRES_HEADER));
        assert!(cache.store().is_empty());
    }

    #[tokio::test]
    async fn test_no_store_prevents_storage() {
        let cache = cache();
        let request = with_cache_control(RequestSnapshot::get("/report"), "no-store");
        let expiration = Utc::now() + TimeDelta::seconds(60);

        cache
            .on_response(&request, Cacheable::new("fresh", expiration).into_response())
            .await;

        assert!(cache.store().is_empty());
    }

    #[tokio::test]
    async fn test_unmarked_response_is_not_stored() {
        let cache = cache();
        cache
            .on_response(&RequestSnapshot::get("/report"), "plain".into_response())
            .await;
        assert!(cache.store().is_empty());
    }

    #[tokio::test]
    async fn test_non_success_marked_response_evicts() {
        let cache = cache();
        seed(&cache, "GET /report", 10, 60);
        let expiration = Utc::now() + TimeDelta::seconds(60);
        let failed = Cacheable::new((StatusCode::NOT_FOUND, "gone"), expiration).into_response();

        let response = cache
            .on_response(&RequestSnapshot::get("/report"), failed)
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(cache.store().get("GET /report").is_none());
        assert_eq!(cache.stats().removals, 1);
    }

    #[tokio::test]
    async fn test_cache_hit_is_not_recommitted() {
        let cache = cache();
        let replay = CachedResponse::new(StatusCode::OK, HeaderMap::new(), "replayed");
        let mut response = replay.into_response();
        response
            .headers_mut()
            .insert(CACHE_EXPIRES_HEADER, HeaderValue::from_static("2099-01-01T00:00:00Z"));

        cache
            .on_response(&RequestSnapshot::get("/report"), response)
            .await;

        assert!(cache.store().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_is_sent_but_not_stored() {
        let cache = cache().with_max_body_size(4);
        let expiration = Utc::now() + TimeDelta::seconds(60);

        let response = cache
            .on_response(
                &RequestSnapshot::get("/big"),
                Cacheable::new("0123456789", expiration).into_response(),
            )
            .await;

        assert_eq!(body_of(response).await, b"0123456789");
        assert!(cache.store().is_empty());
    }

    #[tokio::test]
    async fn test_streamed_body_is_sent_but_not_stored() {
        let cache = cache();
        let expiration = Utc::now() + TimeDelta::seconds(60);
        let chunks = futures::stream::iter(vec![
            Ok::<_, std::io::Error>("chunk one, "),
            Ok("chunk two"),
        ]);

        let response = cache
            .on_response(
                &RequestSnapshot::get("/stream"),
                Cacheable::new(Body::from_stream(chunks), expiration).into_response(),
            )
            .await;

        assert_eq!(body_of(response).await, b"chunk one, chunk two");
        assert!(cache.store().is_empty());
        assert_eq!(cache.stats().stores, 0);
    }
}
