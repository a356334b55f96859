//! Integration Tests for Background Refresh
//!
//! Drives stale hits through a cached router and checks that refreshes are
//! deduplicated per key, and that failed refreshes evict.

use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    routing::get,
    Router,
};
use chrono::{TimeDelta, Utc};
use futures::future::join_all;
use swr_response_cache::{
    cache::{CacheEntry, CachedResponse},
    middleware::CACHE_STATUS_HEADER,
    Cacheable, MemoryStore, QueryKeyGenerator, ResponseCache, ResponseCacheLayer,
};
use tower::ServiceExt;

// == Helper Functions ==

#[derive(Clone)]
struct Backend {
    calls: Arc<AtomicUsize>,
    status: Arc<AtomicU16>,
}

/// Slow handler so the refresh stays in flight while the other requests land.
async fn slow_report(State(backend): State<Backend>) -> Cacheable<(StatusCode, String)> {
    let n = backend.calls.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let status = StatusCode::from_u16(backend.status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Cacheable::new((status, format!("render {}", n)), Utc::now() + TimeDelta::seconds(60))
}

fn app() -> (Router, Backend, Arc<ResponseCache>) {
    let backend = Backend {
        calls: Arc::new(AtomicUsize::new(0)),
        status: Arc::new(AtomicU16::new(200)),
    };
    let cache = Arc::new(ResponseCache::new(
        Arc::new(MemoryStore::new()),
        Arc::new(QueryKeyGenerator::default()),
    ));
    let router = Router::new()
        .route("/report", get(slow_report))
        .route("/other", get(slow_report))
        .layer(ResponseCacheLayer::new(cache.clone()))
        .with_state(backend.clone());
    (router, backend, cache)
}

fn seed_stale(cache: &ResponseCache, key: &str) {
    let expiration = Utc::now() - TimeDelta::seconds(1);
    cache.store().set(CacheEntry {
        key: key.to_string(),
        response: CachedResponse::new(StatusCode::OK, HeaderMap::new(), "stale"),
        created: expiration - TimeDelta::seconds(60),
        expiration,
    });
}

async fn fetch(router: Router, uri: &'static str) -> (StatusCode, String, String) {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let cache_status = response
        .headers()
        .get(CACHE_STATUS_HEADER)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, cache_status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn wait_for_refreshes(cache: &ResponseCache) {
    for _ in 0..200 {
        if cache.refresher().in_flight() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("background refresh did not finish");
}

// == Single-Flight Tests ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stale_hits_refresh_once() {
    const CONCURRENT_REQUESTS: usize = 32;
    let (router, backend, cache) = app();
    seed_stale(&cache, "GET /report");

    let requests = (0..CONCURRENT_REQUESTS).map(|_| {
        let router = router.clone();
        tokio::spawn(async move { fetch(router, "/report").await })
    });
    let results = join_all(requests).await;

    for result in results {
        let (status, cache_status, body) = result.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "stale");
        assert_eq!(cache_status, "STALE");
    }

    wait_for_refreshes(&cache).await;
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    let stats = cache.stats();
    assert_eq!(stats.stale_hits, CONCURRENT_REQUESTS as u64);
    assert_eq!(stats.refreshes, 1);
    assert_eq!(stats.refreshes_deduplicated, CONCURRENT_REQUESTS as u64 - 1);

    let (_, cache_status, body) = fetch(router, "/report").await;
    assert_eq!(body, "render 1");
    assert_eq!(cache_status, "HIT");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stale_keys_refresh_independently() {
    let (router, backend, cache) = app();
    seed_stale(&cache, "GET /report");
    seed_stale(&cache, "GET /other");

    let (a, b) = tokio::join!(
        fetch(router.clone(), "/report"),
        fetch(router.clone(), "/other")
    );
    assert_eq!(a.2, "stale");
    assert_eq!(b.2, "stale");

    wait_for_refreshes(&cache).await;
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_key_is_refreshable_again_after_completion() {
    let (router, backend, cache) = app();
    seed_stale(&cache, "GET /report");
    fetch(router.clone(), "/report").await;
    wait_for_refreshes(&cache).await;

    seed_stale(&cache, "GET /report");
    let (_, cache_status, _) = fetch(router, "/report").await;
    assert_eq!(cache_status, "STALE");

    wait_for_refreshes(&cache).await;
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

// == Failure Tests ==

#[tokio::test]
async fn test_non_success_refresh_evicts_entry() {
    let (router, backend, cache) = app();
    backend.status.store(503, Ordering::SeqCst);
    seed_stale(&cache, "GET /report");

    let (status, _, body) = fetch(router.clone(), "/report").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "stale");

    wait_for_refreshes(&cache).await;
    assert!(cache.store().get("GET /report").is_none());
    assert_eq!(cache.stats().refresh_failures, 1);

    // Next request misses and reaches the handler again
    backend.status.store(200, Ordering::SeqCst);
    let (status, cache_status, body) = fetch(router, "/report").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "render 2");
    assert_eq!(cache_status, "");
}

#[tokio::test]
async fn test_non_success_live_response_evicts_entry() {
    let (router, backend, cache) = app();
    fetch(router.clone(), "/report").await;
    assert!(cache.store().get("GET /report").is_some());

    backend.status.store(500, Ordering::SeqCst);
    let request = Request::get("/report")
        .header("cache-control", "no-cache")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(cache.store().get("GET /report").is_none());
}
