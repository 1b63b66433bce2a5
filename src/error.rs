//! Coordinator error types with wire code and HTTP status mapping.
//!
//! [`CoordinatorError`] is the central error type for the service. Each
//! variant maps to a numeric wire code (carried in WebSocket `error`
//! envelopes) and an HTTP status for the REST surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::{IdentityId, SessionId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "stale session reference: ...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`CoordinatorError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with wire code and HTTP status mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request            |
/// | 2000–2999 | State/Not Found | 404 Not Found              |
/// | 3000–3999 | Server          | 500 Internal Server Error  |
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Request payload was malformed or referenced the wrong identity.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Event referenced a session that has ended or never existed.
    #[error("stale session reference: {0}")]
    StaleSession(SessionId),

    /// No identity with the given ID exists.
    #[error("identity not found: {0}")]
    IdentityNotFound(IdentityId),

    /// Identity storage failed to resolve or create a record.
    #[error("identity resolution failed: {0}")]
    IdentityResolution(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    /// Returns the numeric wire code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::StaleSession(_) => 2001,
            Self::IdentityNotFound(_) => 2002,
            Self::IdentityResolution(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::StaleSession(_) | Self::IdentityNotFound(_) => StatusCode::NOT_FOUND,
            Self::IdentityResolution(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
