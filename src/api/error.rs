use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::queue::{QueueError, SubmitError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("index {index} out of range for pending list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("job queue is full, try again later")]
    QueueFull,
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::IndexOutOfRange { .. } => StatusCode::BAD_REQUEST,
            ApiError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DownloadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            ApiError::QueueFull => "QUEUE_FULL",
            ApiError::DownloadFailed(_) => "DOWNLOAD_FAILED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<QueueError> for ApiError {
    fn from(value: QueueError) -> Self {
        match value {
            QueueError::IndexOutOfRange { index, len } => ApiError::IndexOutOfRange { index, len },
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(value: SubmitError) -> Self {
        match value {
            SubmitError::QueueFull => ApiError::QueueFull,
            SubmitError::Closed => ApiError::Internal("job queue is closed".to_string()),
        }
    }
}
