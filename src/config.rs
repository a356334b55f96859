//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from environment variables.

use std::env;

/// Server and cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Lifetime in seconds given to responses the demo handlers mark cacheable
    pub default_ttl: u64,
    /// Largest response body, in bytes, the cache will store
    pub max_body_size: usize,
    /// Number of background refreshes allowed to run at once
    pub refresh_concurrency: usize,
    /// Query parameters that take part in the default cache key
    pub vary_params: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_TTL` - Demo response lifetime in seconds (default: 60)
    /// - `MAX_BODY_SIZE` - Largest cached body in bytes (default: 1 MiB)
    /// - `REFRESH_CONCURRENCY` - Concurrent background refreshes (default: 4, minimum 1)
    /// - `VARY_PARAMS` - Comma separated query parameter names (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            max_body_size: parse_var("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            refresh_concurrency: parse_var::<usize>("REFRESH_CONCURRENCY")
                .unwrap_or(defaults.refresh_concurrency)
                .max(1),
            vary_params: env::var("VARY_PARAMS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.vary_params),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_ttl: 60,
            max_body_size: 1024 * 1024,
            refresh_concurrency: 4,
            vary_params: Vec::new(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
