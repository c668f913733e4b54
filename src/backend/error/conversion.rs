/**
 * Error Conversion
 *
 * `IntoResponse` for backend errors, so handlers can return them directly.
 *
 * # Response Format
 *
 * ```json
 * {
 *   "error": "Error message",
 *   "status": 400
 * }
 * ```
 */

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use crate::backend::error::types::BackendError;

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("[Server] Request failed: {}", self);
        } else {
            tracing::debug!("[Server] Request rejected: {}", self);
        }

        let body = serde_json::json!({
            "error": self.message(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_into_response_status() {
        let response = BackendError::handler(StatusCode::FORBIDDEN, "no").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
