//! Upstream fetch collaborator.
//!
//! The mediator only sees the [`Fetcher`] trait. [`HttpFetcher`] is the
//! production implementation built on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderValue};
use tracing::{debug, error};

use crate::error::{ProxyError, Result};
use crate::proxy::{strip_hop_by_hop, ProxyRequest, ProxyResponse, VIA_TOKEN};

// == Fetcher Trait ==
/// Performs the real network call for a cache miss.
///
/// Implementations never fail: transport problems are reported as a
/// synthetic server-error response.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: ProxyRequest) -> ProxyResponse;
}

// == HTTP Fetcher ==
/// Forwards requests upstream with reqwest.
///
/// Redirects are passed back to the client untouched and environment proxy
/// settings are ignored so the proxy never loops through itself.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;

        Ok(Self { client })
    }

    async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse> {
        let mut headers = request.headers;
        strip_hop_by_hop(&mut headers);
        // reqwest derives both from the target URL and the body it sends
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
        headers.append(header::VIA, HeaderValue::from_static(VIA_TOKEN));

        let mut builder = self
            .client
            .request(request.method, request.url.as_str())
            .headers(headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let upstream = builder.send().await?;
        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);
        let body = upstream.bytes().await?;

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: ProxyRequest) -> ProxyResponse {
        let method = request.method.clone();
        let url = request.url.clone();

        match self.forward(request).await {
            Ok(response) => {
                debug!("Upstream {} {} -> {}", method, url, response.status);
                response
            }
            Err(err) => {
                error!("Upstream request failed: {} {}: {}", method, url, err);
                let reason = match &err {
                    ProxyError::Upstream(e) if e.is_timeout() => "upstream timed out",
                    ProxyError::Upstream(e) if e.is_connect() => "upstream unreachable",
                    _ => "upstream request failed",
                };
                ProxyResponse::bad_gateway(reason)
            }
        }
    }
}
