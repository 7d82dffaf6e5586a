//! HTTP/1.1 wire codec for cached responses.
//!
//! A cached payload is the full response as it would appear on the wire:
//! status line, header block, blank line, body. Decoding parses it back into
//! a [`ProxyResponse`] so a cache hit replays exactly what was fetched.

use axum::body::Bytes;
use axum::http::{
    header::{HeaderName, CONTENT_LENGTH},
    HeaderMap, HeaderValue, StatusCode,
};

use crate::error::{ProxyError, Result};
use crate::proxy::ProxyResponse;

const CRLF: &[u8] = b"\r\n";
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

// == Encode ==
/// Serialises a response into HTTP/1.1 wire format.
///
/// Header values keep their per-name order, since `HeaderMap` iterates every
/// value of a name in insertion order.
pub fn encode_response(response: &ProxyResponse) -> Bytes {
    let mut buf = Vec::with_capacity(128 + response.body.len());

    buf.extend_from_slice(b"HTTP/1.1 ");
    buf.extend_from_slice(response.status.as_str().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(
        response
            .status
            .canonical_reason()
            .unwrap_or_default()
            .as_bytes(),
    );
    buf.extend_from_slice(CRLF);

    for (name, value) in response.headers.iter() {
        buf.extend_from_slice(name.as_str().as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(CRLF);
    }
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(&response.body);

    Bytes::from(buf)
}

// == Decode ==
/// Parses a payload produced by [`encode_response`].
///
/// Everything after the header block is the body. A `Content-Length` header,
/// when present, must agree with it.
pub fn decode_response(payload: &Bytes) -> Result<ProxyResponse> {
    let head_end = find(payload, HEAD_TERMINATOR)
        .ok_or_else(|| malformed("missing end of header block"))?;
    let head = &payload[..head_end];
    let body = payload.slice(head_end + HEAD_TERMINATOR.len()..);

    let mut lines = head.split(|&b| b == b'\n').map(trim_cr);
    let status_line = lines.next().ok_or_else(|| malformed("empty payload"))?;
    let status = parse_status_line(status_line)?;

    let mut headers = HeaderMap::new();
    for line in lines {
        let (name, value) = parse_header_line(line)?;
        headers.append(name, value);
    }

    if let Some(declared) = headers.get(CONTENT_LENGTH) {
        let declared: usize = declared
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| malformed("invalid Content-Length"))?;
        if declared != body.len() {
            return Err(malformed(format!(
                "Content-Length {} does not match body length {}",
                declared,
                body.len()
            )));
        }
    }

    Ok(ProxyResponse {
        status,
        headers,
        body,
    })
}

fn parse_status_line(line: &[u8]) -> Result<StatusCode> {
    let line = std::str::from_utf8(line).map_err(|_| malformed("status line is not UTF-8"))?;
    let mut parts = line.splitn(3, ' ');

    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(malformed(format!("unsupported version {:?}", version)));
    }

    let code = parts
        .next()
        .ok_or_else(|| malformed("missing status code"))?;
    StatusCode::from_bytes(code.as_bytes())
        .map_err(|_| malformed(format!("invalid status code {:?}", code)))
}

fn parse_header_line(line: &[u8]) -> Result<(HeaderName, HeaderValue)> {
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| malformed("header line without colon"))?;

    let name = HeaderName::from_bytes(&line[..colon])
        .map_err(|_| malformed("invalid header name"))?;
    let value = HeaderValue::from_bytes(trim_ows(&line[colon + 1..]))
        .map_err(|_| malformed(format!("invalid value for header {}", name)))?;

    Ok((name, value))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn trim_ows(mut value: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = value {
        value = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = value {
        value = rest;
    }
    value
}

fn malformed(reason: impl Into<String>) -> ProxyError {
    ProxyError::MalformedPayload(reason.into())
}
