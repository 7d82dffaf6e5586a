//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Proxy Error Enum ==
/// Unified error type for the caching proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The request target cannot be turned into an absolute URL
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// The inbound request body exceeds the configured limit
    #[error("Request body too large: {0}")]
    BodyTooLarge(String),

    /// The inbound request body could not be read
    #[error("Unreadable request body: {0}")]
    RequestBody(String),

    /// The request asks for something the proxy does not do, e.g. CONNECT
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// The request already passed through this proxy
    #[error("Loop detected: {0}")]
    LoopDetected(String),

    /// The upstream server could not be reached or its response read
    #[error("Upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// A cached payload could not be parsed back into a response
    #[error("Malformed cached payload: {0}")]
    MalformedPayload(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            ProxyError::LoopDetected(_) => StatusCode::LOOP_DETECTED,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::MalformedPayload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
