//! HTTP error responses.
//!
//! Client errors carry their message. Server errors are logged with detail
//! and answered with a generic body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nexus_core::GatewayError;
use nexus_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Body of every 5xx response.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Errors returned by handlers and middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Anything the caller cannot fix.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a bad-request error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create an unauthorized error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Authentication(msg) => Self::Unauthorized(msg),
            e if e.is_client_error() => Self::BadRequest(e.to_string()),
            e => Self::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => Self::NotFound(e.to_string()),
            StoreError::InvalidMatchKind(_) => Self::BadRequest(e.to_string()),
            StoreError::Database(_) | StoreError::Io(_) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            Self::Internal(detail) => {
                error!(error = %detail, "request failed");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn gateway_errors_map_to_status() {
        let cases = [
            (GatewayError::missing_event_type(), StatusCode::BAD_REQUEST),
            (
                GatewayError::Authentication("bad key".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                GatewayError::Lookup("db".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                GatewayError::Serialization("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                GatewayError::Internal("task".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.is_client_error(), status.is_client_error());
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn validation_keeps_bare_message() {
        let api = ApiError::from(GatewayError::Validation("invalid body".into()));
        assert!(matches!(api, ApiError::BadRequest(ref m) if m == "invalid body"));
    }

    #[test]
    fn store_errors_map_to_status() {
        assert_eq!(
            ApiError::from(StoreError::NotFound("tenant t1".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::InvalidMatchKind("REGEX".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StoreError::Database("locked".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn validation_message_reaches_client() {
        let resp = ApiError::from(GatewayError::missing_event_type()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "event type is required");
    }

    #[tokio::test]
    async fn internal_detail_is_hidden() {
        let resp = ApiError::from(GatewayError::Lookup("disk I/O error at page 7".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "internal server error");
    }
}
