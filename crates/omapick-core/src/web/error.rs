//! HTTP error handling for the web API.
//!
//! This module provides conversion from core library errors to appropriate
//! HTTP responses with JSON error bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::Error;

/// API error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// HTTP status of the response
    #[serde(skip)]
    pub status: StatusCode,
    /// Error code (e.g., "E001" for a missing preview)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable error message
    pub message: String,
    /// Additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Create an error with an explicit status.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
            details: None,
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create an internal server error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

fn status_for_code(code: &str) -> StatusCode {
    match code {
        "E001" | "E006" | "E007" => StatusCode::NOT_FOUND,
        "E002" => StatusCode::SERVICE_UNAVAILABLE,
        "E003" => StatusCode::UNPROCESSABLE_ENTITY,
        "E004" => StatusCode::BAD_GATEWAY,
        "E005" | "E009" => StatusCode::CONFLICT,
        "E008" => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            other => other
                .code()
                .map_or(StatusCode::INTERNAL_SERVER_ERROR, status_for_code),
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", err);
        }

        Self {
            status,
            code: err.code().map(String::from),
            message: err.to_string(),
            details: err.suggestion().map(String::from),
        }
    }
}

/// Result type for web handlers.
pub type ApiResult<T> = Result<T, ApiError>;
