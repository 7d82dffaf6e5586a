//! API Routes
//!
//! Builds the proxy router and the admin router.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{clear_handler, health_handler, proxy_handler, stats_handler, AppState};

/// Creates the proxy router.
///
/// Every method and path falls through to the proxy handler, so no local
/// route can shadow a proxied URL. Responses are passed through unchanged;
/// only tracing is layered on top.
pub fn create_proxy_router(state: AppState) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the admin router, served on its own port.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Cache statistics
/// - `DELETE /cache` - Drop every cached response
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_admin_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoundedTtlCache;
    use crate::proxy::{Fetcher, ProxyRequest, ProxyResponse};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{HeaderMap, Request, StatusCode},
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tower::util::ServiceExt;

    struct StaticFetcher;

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, _request: ProxyRequest) -> ProxyResponse {
            ProxyResponse::new(StatusCode::OK, HeaderMap::new(), "upstream")
        }
    }

    fn create_test_state() -> AppState {
        let cache = Arc::new(BoundedTtlCache::new(100, Duration::from_secs(300)));
        AppState::new(cache, Arc::new(StaticFetcher))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_admin_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let app = create_admin_router(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_clear_endpoint() {
        let app = create_admin_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/cache")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_proxy_router_does_not_shadow_admin_paths() {
        let app = create_proxy_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("http://example.com/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"upstream");
    }

    #[tokio::test]
    async fn test_proxy_router_bad_target() {
        let app = create_proxy_router(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/no-host").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
