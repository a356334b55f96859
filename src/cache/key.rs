//! Cache key generation
//!
//! Maps a request to the key its response is stored under, or to nothing when
//! the request must not be cached.

use axum::{extract::Query, http::Method};

use crate::middleware::RequestSnapshot;

// == Cache Key Generator Trait ==
/// Pluggable request to key mapping.
pub trait CacheKeyGenerator: Send + Sync {
    /// Returns the cache key for `request`.
    ///
    /// `None` or an empty string marks the request as uncacheable.
    fn generate(&self, request: &RequestSnapshot) -> Option<String>;
}

impl<F> CacheKeyGenerator for F
where
    F: Fn(&RequestSnapshot) -> Option<String> + Send + Sync,
{
    fn generate(&self, request: &RequestSnapshot) -> Option<String> {
        self(request)
    }
}

// == Query Key Generator ==
/// Keys `GET` and `HEAD` requests by method, path and a chosen set of query
/// parameters.
///
/// Parameters outside the vary list do not split the cache; the ones inside are
/// sorted so their order in the URI does not matter.
#[derive(Debug, Clone, Default)]
pub struct QueryKeyGenerator {
    vary_params: Vec<String>,
}

impl QueryKeyGenerator {
    pub fn new<I, S>(vary_params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vary_params: vary_params.into_iter().map(Into::into).collect(),
        }
    }
}

impl CacheKeyGenerator for QueryKeyGenerator {
    fn generate(&self, request: &RequestSnapshot) -> Option<String> {
        if !matches!(request.method, Method::GET | Method::HEAD) {
            return None;
        }

        let mut key = format!("{} {}", request.method, request.uri.path());

        if !self.vary_params.is_empty() {
            let Query(mut pairs) = Query::<Vec<(String, String)>>::try_from_uri(&request.uri)
                .unwrap_or_else(|_| Query(Vec::new()));
            pairs.retain(|(name, _)| self.vary_params.iter().any(|p| p == name));
            pairs.sort();

            // Re-encode so a decoded `&` or `=` cannot forge another key
            let query = serde_urlencoded::to_string(&pairs).ok()?;
            if !query.is_empty() {
                key.push('?');
                key.push_str(&query);
            }
        }

        Some(key)
    }
}
