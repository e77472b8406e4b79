//! Error types surfaced to HTTP clients.
//!
//! Internal plumbing uses `anyhow`; everything that crosses the HTTP
//! boundary is folded into `ApiError` so each failure class maps to a
//! stable status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified client-facing error for both the node and proxy surfaces.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key absent or expired in both cache and backing store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed payload, self-partition request, unknown port.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Node id already registered.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Every replica failed and the backing store could not serve either.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Unexpected proxy-side failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {}", self);
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Convenience Result alias for handler signatures.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                ApiError::Unavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
