//! Error types for the HTTP API layer.
//!
//! [`ApiError`] unifies all handler failure modes into a single enum that
//! converts into a structured JSON response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. No error
//! escapes a handler: a failing engine call costs one request, never the
//! process.

use atlas_db::DbError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Client-facing body for engine failures. The detail is logged server-side
/// with the failing query's identity; clients get a fixed message.
const ENGINE_ERROR_BODY: &str = "An error occurred";

/// Errors that can occur in the HTTP API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad or missing request input, rejected before any engine call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The spatial engine call failed (unreachable or query rejected).
    #[error(transparent)]
    Engine(#[from] DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Engine(e) => {
                tracing::error!(error = %e, "request failed on engine call");
                (StatusCode::INTERNAL_SERVER_ERROR, ENGINE_ERROR_BODY.to_owned())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let response = ApiError::Validation("param1 must be a number".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_failure_maps_to_server_error() {
        let response = ApiError::Engine(DbError::Config("down".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
