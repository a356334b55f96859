//! Tower integration
//!
//! [`ResponseCacheLayer`] wraps a service so every request passes the request
//! interceptor first and every response passes the response committer last.
//! The wrapped service doubles as the [`RequestExecutor`] used by background
//! refreshes: it replays the request with the cache disabled, so the fresh
//! response flows through the committer and replaces the stale entry.

use std::{
    convert::Infallible,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use tower::{Layer, Service, ServiceExt};

use crate::error::Result;
use crate::middleware::{CacheMode, RequestExecutor, RequestSnapshot, ResponseCache};

// == Layer ==
/// Applies the response cache to an inner service.
#[derive(Clone)]
pub struct ResponseCacheLayer {
    cache: Arc<ResponseCache>,
}

impl ResponseCacheLayer {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }
}

impl<S> Layer<S> for ResponseCacheLayer {
    type Service = ResponseCacheService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseCacheService {
            inner,
            cache: Arc::clone(&self.cache),
        }
    }
}

// == Service ==
#[derive(Clone)]
pub struct ResponseCacheService<S> {
    inner: S,
    cache: Arc<ResponseCache>,
}

impl<S> ResponseCacheService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    /// Runs one request through interceptor, inner service and committer.
    async fn dispatch(self, request: Request<Body>, mode: CacheMode) -> Response {
        let snapshot = RequestSnapshot::from_request(&request);

        if let Some(response) = self.cache.on_request(&snapshot, mode, &self).await {
            return response;
        }

        let response = match self.inner.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        self.cache.on_response(&snapshot, response).await
    }
}

impl<S> Service<Request<Body>> for ResponseCacheService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { Ok(this.dispatch(request, CacheMode::Enabled).await) })
    }
}

#[async_trait]
impl<S> RequestExecutor for ResponseCacheService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    async fn execute(&self, request: RequestSnapshot) -> Result<StatusCode> {
        let response = self
            .clone()
            .dispatch(request.to_request(), CacheMode::Disabled)
            .await;

        Ok(response.status())
    }
}
