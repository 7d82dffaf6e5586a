//! Resolution of the absolute upstream URL for an inbound request.

use axum::http::{header, HeaderMap, Uri};

use crate::error::{ProxyError, Result};

/// Resolves the URL a request should be forwarded to.
///
/// - absolute-form targets (`GET http://host/path`) are used as-is
/// - origin-form targets are joined onto `upstream` when one is configured
/// - otherwise the `Host` header names the server, over plain HTTP
pub fn resolve_target(uri: &Uri, headers: &HeaderMap, upstream: Option<&str>) -> Result<String> {
    let target = if uri.scheme().is_some() && uri.authority().is_some() {
        uri.to_string()
    } else {
        let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
        match upstream {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), path),
            None => {
                let host = headers
                    .get(header::HOST)
                    .and_then(|h| h.to_str().ok())
                    .filter(|h| !h.is_empty())
                    .ok_or_else(|| {
                        ProxyError::InvalidTarget(
                            "request has neither an absolute URL nor a Host header".to_string(),
                        )
                    })?;
                format!("http://{}{}", host, path)
            }
        }
    };

    let parsed = reqwest::Url::parse(&target)
        .map_err(|e| ProxyError::InvalidTarget(format!("{}: {}", target, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ProxyError::InvalidTarget(format!(
            "unsupported scheme {}",
            parsed.scheme()
        )));
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn host(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_absolute_form_is_used_verbatim() {
        let uri: Uri = "http://example.com/path?q=1".parse().unwrap();

        let target = resolve_target(&uri, &host("ignored"), Some("http://other")).unwrap();

        assert_eq!(target, "http://example.com/path?q=1");
    }

    #[test]
    fn test_origin_form_joins_upstream() {
        let uri: Uri = "/api/items?page=2".parse().unwrap();

        let target = resolve_target(&uri, &HeaderMap::new(), Some("http://backend:9000/")).unwrap();

        assert_eq!(target, "http://backend:9000/api/items?page=2");
    }

    #[test]
    fn test_origin_form_falls_back_to_host_header() {
        let uri: Uri = "/index.html".parse().unwrap();

        let target = resolve_target(&uri, &host("example.org:8000"), None).unwrap();

        assert_eq!(target, "http://example.org:8000/index.html");
    }

    #[test]
    fn test_missing_host_is_rejected() {
        let uri: Uri = "/".parse().unwrap();

        let result = resolve_target(&uri, &HeaderMap::new(), None);

        assert!(matches!(result, Err(ProxyError::InvalidTarget(_))));
    }

    #[test]
    fn test_unsupported_scheme_is_rejected() {
        let uri: Uri = "ftp://example.com/file".parse().unwrap();

        let result = resolve_target(&uri, &HeaderMap::new(), None);

        assert!(matches!(result, Err(ProxyError::InvalidTarget(_))));
    }
}
