/**
 * Backend Error Types
 *
 * This module defines error types returned by the HTTP handlers. These errors
 * can be converted to HTTP responses.
 *
 * # Error Types
 *
 * - `HandlerError` - Bad request, missing auth and similar request problems
 * - `Realtime` - Errors bubbling up from the collaboration core
 * - `SerializationError` - JSON serialization failures
 */

use thiserror::Error;
use axum::http::StatusCode;

use crate::backend::error::realtime::RealtimeError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use axum::http::StatusCode;
/// use taskcollab::backend::error::BackendError;
///
/// let err = BackendError::handler(StatusCode::BAD_REQUEST, "Invalid request");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g., missing headers, invalid request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Error from the real-time core
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::UNAUTHORIZED, message)
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `Realtime` - 401 for authentication, 404 for validation, 503 for
    ///   directory outages, 400 otherwise
    /// - `SerializationError` - 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Realtime(err) => match err {
                RealtimeError::Authentication(_) => StatusCode::UNAUTHORIZED,
                RealtimeError::Validation { .. } => StatusCode::NOT_FOUND,
                RealtimeError::Directory(_) => StatusCode::SERVICE_UNAVAILABLE,
                RealtimeError::Protocol(_) | RealtimeError::ConnectionClosed(_) => {
                    StatusCode::BAD_REQUEST
                }
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::Realtime(err) => err.client_message(),
            Self::SerializationError(err) => err.to_string(),
        }
    }
}
