//! Cache Proxy - A forward/reverse HTTP proxy with a response cache
//!
//! Upstream `GET` responses with status `200` are kept in a bounded LRU cache
//! with lazy TTL expiration and replayed byte-for-byte on later requests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;

pub use api::AppState;
pub use cache::BoundedTtlCache;
pub use config::Config;
pub use error::{ProxyError, Result};
pub use proxy::{Fetcher, HttpFetcher, ProxyMediator};
