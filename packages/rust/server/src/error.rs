//! Mapping from domain errors to HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use webclip_shared::WebClipError;

use crate::api::{ErrorCode, ErrorResponse};

/// A failed request: status, error code and a human-readable message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }
}

impl From<WebClipError> for ApiError {
    fn from(err: WebClipError) -> Self {
        match err {
            WebClipError::InvalidUrl { .. } => {
                Self::bad_request(ErrorCode::InvalidUrl, err.to_string())
            }
            WebClipError::Fetch(message) => {
                Self::new(StatusCode::BAD_GATEWAY, ErrorCode::FetchError, message)
            }
            WebClipError::Render { message } => Self::bad_request(
                ErrorCode::TemplateError,
                format!("Template error: {message}"),
            ),
            other => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ExtractionError,
                other.to_string(),
            ),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(ErrorCode::InvalidRequest, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(
            status = self.status.as_u16(),
            code = ?self.code,
            error = %self.message,
            "request failed"
        );

        let body = ErrorResponse {
            success: false,
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}
