use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use triage_core::error::AppError;

use crate::dto::ErrorResponse;

/// Errors returned by handlers: domain failures plus transport-level rejections.
pub enum ApiError {
    App(AppError),
    /// Request body exceeded the configured limit while being read.
    PayloadTooLarge(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Streamed bodies carry no Content-Length, so the limit trips inside the extractor
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge(rejection.body_text());
        }
        Self::App(AppError::ValidationError(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::App(AppError::ValidationError(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::App(err) => err,
            Self::PayloadTooLarge(message) => {
                let body = ErrorResponse {
                    error: "payload_too_large".to_string(),
                    message,
                };
                return (StatusCode::PAYLOAD_TOO_LARGE, axum::Json(body)).into_response();
            }
        };

        let (status, error_type) = match &err {
            AppError::ValidationError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::EmptyQueue | AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::SerializationError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            AppError::ModelError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "model_error"),
            AppError::PolicyStoreError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "policy_error"),
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: err.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
