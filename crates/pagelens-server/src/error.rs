use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use pagelens_core::error::AppError;

use crate::dto::ErrorResponse;

/// Error returned by route handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request itself is invalid.
    BadRequest(String),
    App(AppError),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "validation_error", message),
            ApiError::App(err) => {
                let (status, error_type) = match &err {
                    AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                    AppError::SerializationError(_) => {
                        (StatusCode::BAD_REQUEST, "serialization_error")
                    }
                    AppError::DatabaseError(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                    }
                    AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
                    AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
                };
                if status.is_server_error() {
                    tracing::error!(error = %err, "Request failed");
                }
                (status, error_type, err.to_string())
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}
