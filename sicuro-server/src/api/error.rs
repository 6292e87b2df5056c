//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::{log_service, trigger_service};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<log_service::LogError> for ApiError {
    fn from(err: log_service::LogError) -> Self {
        match err {
            log_service::LogError::InvalidName(name) => {
                ApiError::BadRequest(format!("Invalid log name '{}'", name))
            }
            log_service::LogError::NotFound(name) => {
                ApiError::NotFound(format!("Log {} not found", name))
            }
            log_service::LogError::Io(e) => ApiError::InternalError(e.to_string()),
            log_service::LogError::Ledger(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<trigger_service::TriggerError> for ApiError {
    fn from(err: trigger_service::TriggerError) -> Self {
        match err {
            trigger_service::TriggerError::UnsupportedLanguage(language) => {
                ApiError::BadRequest(format!("Language '{}' is not supported", language))
            }
            trigger_service::TriggerError::InvalidTarget(msg) => ApiError::BadRequest(msg),
            trigger_service::TriggerError::Setup(msg) => ApiError::InternalError(msg),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
