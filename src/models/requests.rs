//! Request DTOs for the admin API
//!
//! Defines the structure of incoming query strings.

use serde::Deserialize;

/// Query for the purge operation (DELETE /cache?key=...)
///
/// # Fields
/// - `key`: The cache key to remove, e.g. `GET /time`
#[derive(Debug, Clone, Deserialize)]
pub struct PurgeRequest {
    /// The cache key
    pub key: String,
}

impl PurgeRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.trim().is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }
}
