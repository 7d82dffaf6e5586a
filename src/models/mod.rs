//! Response models for the admin API
//!
//! This module defines the DTOs (Data Transfer Objects) serialised into the
//! admin endpoints' JSON bodies and into proxy error responses.

pub mod responses;

// Re-export commonly used types
pub use responses::{ClearResponse, ErrorResponse, HealthResponse, StatsResponse};
