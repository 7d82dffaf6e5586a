//! Cache policy for proxied requests.
//!
//! Per request: derive the key, look it up, and either replay the cached
//! response or fetch upstream and decide whether the result may be stored.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use tracing::{debug, info, warn};

use crate::cache::BoundedTtlCache;
use crate::proxy::{
    decode_response, encode_response, CacheKey, Fetcher, ProxyRequest, ProxyResponse,
};

// == Cache Status ==
/// How a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Replayed from the cache without contacting upstream
    Hit,
    /// Fetched upstream and stored
    Stored,
    /// Fetched upstream and not eligible for storage
    Bypassed,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Stored => "stored",
            CacheStatus::Bypassed => "bypassed",
        }
    }
}

// == Proxy Mediator ==
/// Decides whether to serve from cache and whether to populate it.
#[derive(Clone)]
pub struct ProxyMediator {
    cache: Arc<BoundedTtlCache>,
    fetcher: Arc<dyn Fetcher>,
}

impl ProxyMediator {
    pub fn new(cache: Arc<BoundedTtlCache>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &Arc<BoundedTtlCache> {
        &self.cache
    }

    /// Whether a fetched response may be stored: only `GET` answered with `200`.
    pub fn is_cacheable(method: &Method, status: StatusCode) -> bool {
        method == Method::GET && status == StatusCode::OK
    }

    // == Handle ==
    /// Serves a request, returning the response and how it was produced.
    ///
    /// The cache lock is never held while the upstream fetch is in flight, so
    /// concurrent misses on the same key each fetch independently.
    pub async fn handle(&self, request: ProxyRequest) -> (ProxyResponse, CacheStatus) {
        let key = CacheKey::new(&request.method, &request.url);

        if let Some(entry) = self.cache.get(key.as_str()) {
            match decode_response(&entry.payload) {
                Ok(response) => {
                    info!("Serving from cache: {} status={}", key, response.status);
                    return (response, CacheStatus::Hit);
                }
                Err(err) => {
                    warn!("Discarding unreadable cache entry {}: {}", key, err);
                    self.cache.discard_hit(key.as_str());
                }
            }
        }

        let method = request.method.clone();
        let response = self.fetcher.fetch(request).await;

        if !Self::is_cacheable(&method, response.status) {
            debug!("Not caching {} status={}", key, response.status);
            return (response, CacheStatus::Bypassed);
        }

        info!("Cache miss, storing {}", key);
        self.cache.put(key, encode_response(&response));
        (response, CacheStatus::Stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Bytes;
    use axum::http::{header, HeaderMap, HeaderValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fetcher answering every request with a fixed status, counting calls.
    struct CountingFetcher {
        status: StatusCode,
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new(status: StatusCode) -> Arc<Self> {
            Arc::new(Self {
                status,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, request: ProxyRequest) -> ProxyResponse {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            // Suspend once so concurrent handlers interleave like real I/O
            tokio::task::yield_now().await;
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            headers.append("x-tag", HeaderValue::from_static("one"));
            headers.append("x-tag", HeaderValue::from_static("two"));
            ProxyResponse::new(
                self.status,
                headers,
                format!("{} {} #{}", request.method, request.url, n),
            )
        }
    }

    fn mediator(fetcher: Arc<CountingFetcher>) -> ProxyMediator {
        let cache = Arc::new(BoundedTtlCache::new(16, Duration::from_secs(300)));
        ProxyMediator::new(cache, fetcher)
    }

    fn get(url: &str) -> ProxyRequest {
        ProxyRequest::new(Method::GET, url)
    }

    #[tokio::test]
    async fn test_miss_then_fetch_then_cache() {
        let fetcher = CountingFetcher::new(StatusCode::OK);
        let mediator = mediator(fetcher.clone());

        let (first, status) = mediator.handle(get("http://example.com/a")).await;
        assert_eq!(status, CacheStatus::Stored);
        assert_eq!(fetcher.calls(), 1);

        let (second, status) = mediator.handle(get("http://example.com/a")).await;
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(second, first);

        let tags: Vec<_> = second.headers.get_all("x-tag").iter().collect();
        assert_eq!(tags, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_get_404_is_not_cached() {
        let fetcher = CountingFetcher::new(StatusCode::NOT_FOUND);
        let mediator = mediator(fetcher.clone());

        let (_, status) = mediator.handle(get("http://example.com/missing")).await;
        assert_eq!(status, CacheStatus::Bypassed);
        mediator.handle(get("http://example.com/missing")).await;

        assert_eq!(fetcher.calls(), 2);
        assert!(mediator.cache().is_empty());
    }

    #[tokio::test]
    async fn test_post_200_is_not_cached() {
        let fetcher = CountingFetcher::new(StatusCode::OK);
        let mediator = mediator(fetcher.clone());

        let post = ProxyRequest::new(Method::POST, "http://example.com/submit");
        let (response, status) = mediator.handle(post.clone()).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(status, CacheStatus::Bypassed);

        mediator.handle(post).await;
        assert_eq!(fetcher.calls(), 2);
        assert!(mediator
            .cache()
            .get("POST:http://example.com/submit")
            .is_none());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_served_but_not_cached() {
        let fetcher = CountingFetcher::new(StatusCode::BAD_GATEWAY);
        let mediator = mediator(fetcher.clone());

        let (response, _) = mediator.handle(get("http://down.test/")).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert!(mediator.cache().is_empty());
    }

    #[tokio::test]
    async fn test_method_is_part_of_the_key() {
        let fetcher = CountingFetcher::new(StatusCode::OK);
        let mediator = mediator(fetcher.clone());

        mediator.handle(get("http://example.com/")).await;
        let (_, status) = mediator
            .handle(ProxyRequest::new(Method::HEAD, "http://example.com/"))
            .await;

        assert_eq!(status, CacheStatus::Bypassed);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_refetched_and_replaced() {
        let fetcher = CountingFetcher::new(StatusCode::OK);
        let mediator = mediator(fetcher.clone());
        let key = "GET:http://example.com/corrupt";
        mediator
            .cache()
            .put(key, Bytes::from_static(b"not an http response"));

        let (response, status) = mediator.handle(get("http://example.com/corrupt")).await;

        assert_eq!(status, CacheStatus::Stored);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(fetcher.calls(), 1);
        let stored = mediator.cache().get(key).unwrap();
        assert_eq!(decode_response(&stored.payload).unwrap(), response);
    }

    #[tokio::test]
    async fn test_corrupt_entry_counts_as_miss() {
        let fetcher = CountingFetcher::new(StatusCode::OK);
        let mediator = mediator(fetcher.clone());
        mediator.cache().put(
            "GET:http://example.com/corrupt",
            Bytes::from_static(b"garbage"),
        );

        mediator.handle(get("http://example.com/corrupt")).await;

        let stats = mediator.cache().stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let fetcher = CountingFetcher::new(StatusCode::OK);
        let cache = Arc::new(BoundedTtlCache::new(4, Duration::from_secs(60)));
        let mediator = ProxyMediator::new(cache, fetcher.clone());

        mediator.handle(get("http://example.com/")).await;
        tokio::time::advance(Duration::from_secs(60)).await;
        let (_, status) = mediator.handle(get("http://example.com/")).await;

        assert_eq!(status, CacheStatus::Stored);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_cold_misses_each_fetch() {
        let fetcher = CountingFetcher::new(StatusCode::OK);
        let mediator = mediator(fetcher.clone());

        let a = mediator.handle(get("http://example.com/hot"));
        let b = mediator.handle(get("http://example.com/hot"));
        let ((_, sa), (_, sb)) = tokio::join!(a, b);

        assert_eq!(sa, CacheStatus::Stored);
        assert_eq!(sb, CacheStatus::Stored);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(mediator.cache().len(), 1);
    }
}
