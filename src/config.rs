//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port of the proxy listener
    pub proxy_port: u16,
    /// Port of the admin listener (health and stats)
    pub admin_port: u16,
    /// Maximum number of cached responses
    pub cache_capacity: usize,
    /// Lifetime of a cached response in seconds
    pub cache_ttl: u64,
    /// Base URL for reverse-proxy mode; requests in origin-form are sent here
    pub upstream_url: Option<String>,
    /// Upstream request timeout in seconds
    pub upstream_timeout: u64,
    /// Largest accepted inbound request body in bytes
    pub max_body_size: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PROXY_PORT` - Proxy listener port (default: 8080)
    /// - `ADMIN_PORT` - Admin listener port (default: 8081)
    /// - `CACHE_CAPACITY` - Maximum cached responses (default: 100)
    /// - `CACHE_TTL` - Cached response lifetime in seconds (default: 300)
    /// - `UPSTREAM_URL` - Reverse-proxy base URL (default: unset)
    /// - `UPSTREAM_TIMEOUT` - Upstream timeout in seconds (default: 30)
    /// - `MAX_BODY_SIZE` - Inbound body limit in bytes (default: 10 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            proxy_port: parse_var("PROXY_PORT").unwrap_or(defaults.proxy_port),
            admin_port: parse_var("ADMIN_PORT").unwrap_or(defaults.admin_port),
            cache_capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.cache_capacity),
            cache_ttl: parse_var("CACHE_TTL").unwrap_or(defaults.cache_ttl),
            upstream_url: env::var("UPSTREAM_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            upstream_timeout: parse_var("UPSTREAM_TIMEOUT").unwrap_or(defaults.upstream_timeout),
            max_body_size: parse_var("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_port: 8080,
            admin_port: 8081,
            cache_capacity: 100,
            cache_ttl: 300,
            upstream_url: None,
            upstream_timeout: 30,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
