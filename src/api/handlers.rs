//! API Handlers
//!
//! The catch-all proxy handler plus the admin endpoints.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
    Json,
};
use http_body_util::LengthLimitError;
use tracing::info;

use crate::api::target::resolve_target;
use crate::cache::BoundedTtlCache;
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::models::{ClearResponse, HealthResponse, StatsResponse};
use crate::proxy::{has_looped, Fetcher, HttpFetcher, ProxyMediator, ProxyRequest};

/// Application state shared across all handlers.
///
/// The cache is owned here and injected into the mediator; its lifetime is
/// that of the server.
#[derive(Clone)]
pub struct AppState {
    /// Cache policy and the cache it drives
    pub mediator: ProxyMediator,
    /// Reverse-proxy base URL for origin-form requests
    pub upstream_url: Option<String>,
    /// Largest accepted inbound body in bytes
    pub max_body_size: usize,
}

impl AppState {
    /// Creates a new AppState around a cache and a fetcher.
    pub fn new(cache: Arc<BoundedTtlCache>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            mediator: ProxyMediator::new(cache, fetcher),
            upstream_url: None,
            max_body_size: Config::default().max_body_size,
        }
    }

    /// Routes origin-form requests to `url`.
    pub fn with_upstream(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = Some(url.into());
        self
    }

    pub fn with_max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the cache and the reqwest-backed fetcher with the configured
    /// capacity, TTL and upstream timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        if let Some(url) = &config.upstream_url {
            reqwest::Url::parse(url)
                .map_err(|e| ProxyError::InvalidTarget(format!("UPSTREAM_URL {}: {}", url, e)))?;
        }

        let cache = Arc::new(BoundedTtlCache::new(
            config.cache_capacity,
            config.cache_ttl(),
        ));
        let fetcher = Arc::new(HttpFetcher::new(config.upstream_timeout())?);

        let mut state = Self::new(cache, fetcher).with_max_body_size(config.max_body_size);
        state.upstream_url = config.upstream_url.clone();
        Ok(state)
    }

    pub fn cache(&self) -> &Arc<BoundedTtlCache> {
        self.mediator.cache()
    }
}

/// Catch-all proxy handler.
///
/// Resolves the target, buffers the body and hands the request to the
/// mediator, which answers from cache or upstream.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let started = Instant::now();
    let (parts, body) = request.into_parts();

    if parts.method == Method::CONNECT {
        return Err(ProxyError::Unsupported(
            "CONNECT tunnelling is not supported".to_string(),
        ));
    }
    if has_looped(&parts.headers) {
        return Err(ProxyError::LoopDetected(parts.uri.to_string()));
    }

    let url = resolve_target(&parts.uri, &parts.headers, state.upstream_url.as_deref())?;
    info!("Incoming request: {} {}", parts.method, url);

    let body = read_body(body, &parts.headers, state.max_body_size).await?;
    let request = ProxyRequest {
        method: parts.method.clone(),
        url,
        headers: parts.headers,
        body,
    };
    let url = request.url.clone();

    let (response, cache_status) = state.mediator.handle(request).await;

    info!(
        "Response sent: {} {} status={} cache={} duration_ms={}",
        parts.method,
        url,
        response.status,
        cache_status.as_str(),
        started.elapsed().as_millis()
    );
    Ok(response.into_response())
}

async fn read_body(body: Body, headers: &HeaderMap, limit: usize) -> Result<axum::body::Bytes> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if let Some(len) = declared.filter(|&len| len > limit) {
        return Err(ProxyError::BodyTooLarge(format!(
            "{} bytes exceeds the {} byte limit",
            len, limit
        )));
    }

    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeds_limit(&e) {
            ProxyError::BodyTooLarge(format!("body exceeds the {} byte limit", limit))
        } else {
            ProxyError::RequestBody(e.to_string())
        }
    })
}

/// Streamed bodies have no declared length, so the limit only shows up in
/// the error chain of the collecting read.
fn exceeds_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.is::<LengthLimitError>() {
            return true;
        }
        current = err.source();
    }
    false
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache();
    Json(StatsResponse::new(
        &cache.stats(),
        cache.capacity(),
        cache.ttl().as_secs(),
    ))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache().clear();
    info!("Cache cleared: {} entries removed", removed);
    Json(ClearResponse::new(removed))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
