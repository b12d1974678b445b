//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use vve_models::IdError;
use vve_pipeline::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

const INTERNAL_ERROR_MESSAGE: &str = "An unknown error occurred.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Pipeline(e) => StatusCode::from_u16(e.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl From<IdError> for ApiError {
    fn from(e: IdError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge("Uploaded file is too large".to_string())
        } else {
            Self::BadRequest(format!("Malformed upload: {}", e.body_text()))
        }
    }
}

/// Error envelope returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    pub status_code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Pipeline messages are already path-free; details only reach the log.
        let message = match &self {
            ApiError::Pipeline(e) => {
                let detail = e.detail.as_deref().unwrap_or("none");
                if status.is_server_error() {
                    error!(kind = e.kind.as_str(), retryable = e.retryable, "{} (detail: {})", e.message, detail);
                } else {
                    warn!(kind = e.kind.as_str(), "{} (detail: {})", e.message, detail);
                }
                e.message.clone()
            }
            // Internal messages may carry local paths; they stay in the log.
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            message,
            status_code: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}
