//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps store, registry, and validation errors to HTTP status codes and
//! returns JSON error bodies with an error code and message. Internal
//! error details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::registry::RegistryError;
use crate::storage::StoreError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown slug or missing backing file (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing file, wrong extension, or malformed upload (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Upload exceeds the configured size limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ipadrop_core::ValidationError> for AppError {
    fn from(err: ipadrop_core::ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::Empty | StoreError::Read(_) => Self::BadRequest(err.to_string()),
            StoreError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            StoreError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (
                AppError::PayloadTooLarge("x".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
            ),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code));
        }
    }

    #[tokio::test]
    async fn into_response_not_found() {
        let (status, body) = response_parts(AppError::NotFound("File missing".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.code, "NOT_FOUND");
        assert!(body.error.message.contains("File missing"));
    }

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let (status, body) =
            response_parts(AppError::Internal("disk /var/data is full".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(!body.error.message.contains("/var/data"));
    }

    #[test]
    fn validation_error_is_bad_request() {
        let err = AppError::from(ipadrop_core::ValidationError::InvalidExtension(
            "a.apk".into(),
        ));
        match err {
            AppError::BadRequest(msg) => assert!(msg.contains("only .ipa files are allowed")),
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn store_errors_map_by_side() {
        let (status, _) = AppError::from(StoreError::Empty).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = AppError::from(StoreError::TooLarge { limit: 10 }).status_and_code();
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let read = StoreError::Read(std::io::Error::other("client went away"));
        assert_eq!(AppError::from(read).status_and_code().0, StatusCode::BAD_REQUEST);

        let write = StoreError::Io(std::io::Error::other("no space left on device"));
        assert_eq!(
            AppError::from(write).status_and_code().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
