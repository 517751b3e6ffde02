//! Gateway error types.
//!
//! - [`ApiError`] is what HTTP callers see: a status code plus a short
//!   machine-readable code and a message.
//! - [`HandshakeRejection`] is why a socket was closed right after upgrade.
//! - [`GatewayError`] covers startup and serving failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fl_01_trip_lifecycle::TripError;
use serde::Serialize;
use std::fmt;

/// Machine-readable error codes in HTTP bodies
pub mod codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_TRANSITION: &str = "invalid_transition";
    pub const BLOCKED: &str = "blocked";
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const PERSISTENCE: &str = "persistence_failure";
}

/// HTTP-facing error
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Resource not found (trip, status, location)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    /// Malformed path or body
    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_REQUEST,
            format!("Invalid request: {}", details.into()),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<TripError> for ApiError {
    fn from(e: TripError) -> Self {
        let message = e.to_string();
        match e {
            TripError::TripNotFound(_)
            | TripError::StatusNotFound(_)
            | TripError::ReportNotFound { .. } => ApiError::not_found(message),
            TripError::InvalidTransition { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, codes::INVALID_TRANSITION, message)
            }
            TripError::Blocked(_) => ApiError::new(StatusCode::BAD_REQUEST, codes::BLOCKED, message),
            TripError::TransientPersistence(_) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::PERSISTENCE,
                message,
            ),
        }
    }
}

/// Result type for HTTP handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Why a freshly upgraded socket is closed with a policy-violation code.
///
/// `Unauthorized` deliberately carries no detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeRejection {
    #[error("unauthorized")]
    Unauthorized,
    #[error("policy violation: {0}")]
    PolicyViolation(&'static str),
}

impl HandshakeRejection {
    /// Close reason sent to the peer
    pub fn reason(&self) -> &'static str {
        match self {
            HandshakeRejection::Unauthorized => "unauthorized",
            HandshakeRejection::PolicyViolation(reason) => reason,
        }
    }
}

/// Gateway-level errors (startup and serving)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
