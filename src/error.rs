//! Error types and axum response conversions.
//!
//! Backend and frontend failures are expected and recoverable by the
//! coordinator; only renewal failures and wiring defects are fatal. By the
//! time an error reaches the client it collapses into a generic body —
//! clients cannot distinguish "not found" from "signature invalid" from
//! "verification failed".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures local to a session backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("session {0} not found on the backend")]
    NotFound(String),

    #[error("session {0} already exists on the backend")]
    AlreadyExists(String),

    /// Transport or serialization failure talking to the store.
    #[error("store error: {0}")]
    Store(String),
}

/// Failures local to a session frontend. Both variants mean "the client
/// holds no usable token" and degrade to the new-session path.
#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    #[error("session token not set")]
    NotSet,

    #[error("invalid session token")]
    InvalidToken,
}

/// Top-level error surfaced to axum.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Frontend(#[from] FrontendError),

    /// Policy rejected the session, or the record could not be loaded
    /// during verification. Deliberately uniform.
    #[error("session is invalid")]
    Invalid,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            SessionError::Invalid => (StatusCode::BAD_REQUEST, "Session is invalid."),
            SessionError::Frontend(_) => (StatusCode::BAD_REQUEST, "Session is invalid."),
            SessionError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal session error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            SessionError::Backend(err) => {
                tracing::error!(error = %err, "Session backend error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// Convenience conversions from common error types
impl From<redis::RedisError> for BackendError {
    fn from(err: redis::RedisError) -> Self {
        BackendError::Store(format!("Redis error: {}", err))
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Store(format!("JSON error: {}", err))
    }
}
