//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the response cache.
///
/// Failed refreshes and unparsable expirations are logged and never reach a
/// client. A response body that fails while the committer buffers it is already
/// consumed, so that client gets [`CacheError::Body`] as a 502 instead. The admin
/// API renders its own errors through [`IntoResponse`].
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present in the store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Side-channel expiration value could not be parsed
    #[error("Invalid expiration: {0}")]
    InvalidExpiration(String),

    /// Response body could not be buffered
    #[error("Body error: {0}")]
    Body(String),

    /// Background re-execution of a request failed
    #[error("Executor error: {0}")]
    Executor(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::InvalidExpiration(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::Body(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            CacheError::Executor(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the response cache.
pub type Result<T> = std::result::Result<T, CacheError>;
