// src/web/error.rs
// HTTP error responses

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

use crate::error::EmotionChatError;

/// Standard API error response
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: &'static str,
}

impl ApiError {
    pub fn new(status_code: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
            error_code,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": true,
            "message": self.message,
            "status": self.status_code.as_u16(),
            "error_code": self.error_code,
        });

        (self.status_code, Json(body)).into_response()
    }
}

impl From<EmotionChatError> for ApiError {
    fn from(err: EmotionChatError) -> Self {
        // Classifier internals stay in the log, clients get a fixed message
        let api_error = match &err {
            EmotionChatError::Tokenization(_) | EmotionChatError::Inference(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INFERENCE_FAILED",
                "failed to classify message",
            ),
            EmotionChatError::Generation(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "GENERATION_FAILED", err.to_string())
            }
            EmotionChatError::GenerationTimeout(_) => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "GENERATION_TIMEOUT", err.to_string())
            }
            _ => Self::internal("internal server error"),
        };
        error!(
            status = api_error.status_code.as_u16(),
            code = api_error.error_code,
            "{}",
            err
        );
        api_error
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let api_error = Self::new(rejection.status(), "INVALID_REQUEST", rejection.body_text());
        warn!(status = api_error.status_code.as_u16(), "Rejected request: {}", api_error.message);
        api_error
    }
}

/// Result type alias for handlers
pub type ApiResult<T> = Result<T, ApiError>;
