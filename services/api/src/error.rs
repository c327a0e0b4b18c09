//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how each
//! variant is rendered into the JSON envelope at the request boundary.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use learnstake_core::{PortError, ServiceError};
use serde_json::json;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure to apply the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or incomplete request input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Missing, malformed, expired or wrongly signed credential.
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    /// A third-party service reported a failure.
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// The text generator replied with something unreadable.
    #[error("Upstream response could not be parsed: {0}")]
    UpstreamFormat(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "Unauthenticated"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UpstreamError"),
            ApiError::UpstreamFormat(_) => (StatusCode::BAD_GATEWAY, "UpstreamFormatError"),
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Migration(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ServerError"),
        }
    }
}

impl From<PortError> for ApiError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(message) => ApiError::NotFound(message),
            PortError::Unauthorized => ApiError::Unauthenticated("Unauthorized".to_string()),
            PortError::Upstream(message) => ApiError::Upstream(message),
            PortError::Unexpected(message) => ApiError::Internal(message),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(message) => ApiError::Validation(message),
            ServiceError::NotFound(message) => ApiError::NotFound(message),
            ServiceError::UpstreamFormat(message) => ApiError::UpstreamFormat(message),
            ServiceError::Port(port) => port.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "Server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "error": kind,
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
