//! Server-wide error type for read endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::ingest::StoreError;

/// Failures surfaced by the dashboard and progress endpoints
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::Database(e),
            StoreError::Unavailable(msg) => AppError::Unavailable(msg),
            StoreError::Integrity(msg) => AppError::Internal(msg),
        }
    }
}

impl AppError {
    /// Status and stable error code sent to clients
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "DB_CONNECTION_FAILURE"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Server-side failures are logged in full and masked for the client
        let message = match self {
            AppError::NotFound(message) | AppError::BadRequest(message) => message,
            AppError::Unavailable(detail) => {
                tracing::error!(%detail, "Link store unreachable");
                "Database connection failed".to_string()
            },
            other => {
                tracing::error!(error = ?other, code, "Request failed");
                "An internal error occurred".to_string()
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, AppError>;
