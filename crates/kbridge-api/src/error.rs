//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Request-level failures only: per-statement and entity-creation failures
//! are reported inside a 200 `OperationOutcome`, never through here.
//! Internal error details are never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kbridge_client::KbApiError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed or names an unknown instance (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Upstream knowledge base or archive failed (502).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The request did not finish within its deadline (504).
    #[error("timed out: {0}")]
    Timeout(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Upstream(_) | Self::Timeout(_) => tracing::warn!(error = %self, "request failed"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<kbridge_core::ValidationError> for AppError {
    fn from(err: kbridge_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Client-facing message for upstream failures whose detail may carry
/// remote response bodies.
const UPSTREAM_FAILURE: &str = "knowledge base or archive request failed";

impl From<KbApiError> for AppError {
    fn from(err: KbApiError) -> Self {
        match err {
            KbApiError::Validation(e) => Self::Validation(e.to_string()),
            KbApiError::Config(e) => Self::Internal(e.to_string()),
            not_found @ KbApiError::NotFound { .. } => Self::Upstream(not_found.to_string()),
            other => {
                tracing::warn!(error = %other, "upstream call failed");
                Self::Upstream(UPSTREAM_FAILURE.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use kbridge_core::{RepositoryTarget, ValidationError};

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            AppError::Validation("x".into()).status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
        );
        assert_eq!(
            AppError::BadRequest("x".into()).status_and_code(),
            (StatusCode::BAD_REQUEST, "BAD_REQUEST")
        );
        assert_eq!(
            AppError::Upstream("x".into()).status_and_code(),
            (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
        );
        assert_eq!(
            AppError::Timeout("x".into()).status_and_code(),
            (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT")
        );
    }

    #[test]
    fn client_errors_map_by_kind() {
        let not_found = KbApiError::NotFound {
            repository: RepositoryTarget::Public,
            id: "Q1".into(),
        };
        assert!(matches!(AppError::from(not_found), AppError::Upstream(_)));
        let invalid = KbApiError::Validation(ValidationError::InvalidItemId("x".into()));
        assert!(matches!(AppError::from(invalid), AppError::Validation(_)));
    }

    #[tokio::test]
    async fn upstream_response_body_is_hidden() {
        let remote = KbApiError::ApiError {
            endpoint: "wbgetentities".into(),
            status: 500,
            body: "DBQueryError at db1042".into(),
        };
        let (status, body) = response_parts(AppError::from(remote)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error.code, "UPSTREAM_ERROR");
        assert!(!body.error.message.contains("db1042"));
        assert!(body.error.message.contains(UPSTREAM_FAILURE));
    }

    #[tokio::test]
    async fn not_found_names_the_item() {
        let not_found = KbApiError::NotFound {
            repository: RepositoryTarget::Public,
            id: "Q404".into(),
        };
        let (status, body) = response_parts(AppError::from(not_found)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body.error.message,
            "upstream error: Q404 not found in wikidata"
        );
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let (status, body) = response_parts(AppError::Internal("token=secret".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn validation_message_is_returned() {
        let (status, body) =
            response_parts(AppError::Validation("invalid item ID".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error.code, "VALIDATION_ERROR");
        assert!(body.error.message.contains("invalid item ID"));
    }
}
