//! API Module
//!
//! HTTP handlers and routing for the proxy and its admin API.
//!
//! # Proxy listener
//! - any method, any path - forwarded upstream through the cache
//!
//! # Admin listener
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics
//! - `DELETE /cache` - Clear the cache

pub mod handlers;
pub mod routes;
pub mod target;

pub use handlers::*;
pub use routes::{create_admin_router, create_proxy_router};
pub use target::resolve_target;
