//! Collaborator hooks
//!
//! Capabilities the cache borrows from its host: re-running a request end to
//! end, and re-checking authentication before a cached response is released.

use async_trait::async_trait;
use axum::{
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::Result;
use crate::middleware::RequestSnapshot;

// == Request Executor ==
/// Re-runs a request through the full pipeline with the cache disabled.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Executes `request` and reports the status of the produced response.
    ///
    /// The executor is responsible for letting the produced response reach the
    /// response committer so a successful refresh replaces the stored entry.
    async fn execute(&self, request: RequestSnapshot) -> Result<StatusCode>;
}

// == Pre-Requirements ==
/// Authentication and validation that must pass before a cached response is
/// released.
#[async_trait]
pub trait PreRequirements: Send + Sync {
    /// Returns a response to send instead of the cached one, or `None` to allow it.
    async fn run(&self, request: &RequestSnapshot) -> Option<Response>;
}

// == Require Header ==
/// Pre-requirement that rejects requests lacking a header with `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct RequireHeader {
    name: HeaderName,
}

impl RequireHeader {
    pub fn new(name: HeaderName) -> Self {
        Self { name }
    }
}

#[async_trait]
impl PreRequirements for RequireHeader {
    async fn run(&self, request: &RequestSnapshot) -> Option<Response> {
        if request.headers.contains_key(&self.name) {
            None
        } else {
            Some(StatusCode::UNAUTHORIZED.into_response())
        }
    }
}
