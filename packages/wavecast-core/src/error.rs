//! Centralized error types for the Wavecast core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for plain-text error responses
//!
//! The /stream endpoint reports failures as plain text (the caller is an
//! `<audio>` element, not an API client), as do method rejections on both
//! endpoints; /icy wraps resolution failures in its JSON envelope itself.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::plain_text;

/// Application-wide error type for the Wavecast proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The `url` parameter is malformed, relative, or uses a scheme other
    /// than http/https. Detected before any outbound network call.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// The endpoint does not support the request method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The upstream fetch did not complete within its wall-clock budget.
    /// Never retried; the in-flight attempt is cancelled.
    #[error("Upstream timed out: {0}")]
    UpstreamTimeout(String),

    /// Network-level upstream failure (DNS, connect, TLS, reset).
    /// Never retried.
    #[error("Upstream fetch failed: {0}")]
    UpstreamUnreachable(String),

    /// Internal server error (response assembly, invalid header values).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Returns a machine-readable error code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTarget(_) => "invalid_target",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::UpstreamTimeout(_) => "upstream_timeout",
            Self::UpstreamUnreachable(_) => "upstream_unreachable",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::UpstreamTimeout(_) | Self::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        plain_text(self.status_code(), &self.to_string())
    }
}
