//! API error types with IntoResponse
//!
//! Errors are converted to `{error, message}` JSON bodies with matching
//! status codes. Database and internal failures are logged and masked.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use govboard_core::model::ValidationError;
use govboard_core::SyncError;
use govboard_sources::SourceError;
use govboard_store::DbError;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Malformed request outside field validation (400)
    BadRequest(String),

    /// Missing or wrong credentials (401)
    Unauthorized(String),

    /// Caller lacks the required role (403)
    Forbidden { reason: String },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Request conflicts with current state (409)
    Conflict(String),

    /// An upstream API failed (502)
    Upstream(String),

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message) = match self {
            Self::Validation(e) => ("validation_error", e.to_string()),
            Self::BadRequest(message) => ("bad_request", message),
            Self::Unauthorized(message) => ("unauthorized", message),
            Self::Forbidden { reason } => ("forbidden", reason),
            Self::NotFound { resource, id } => ("not_found", format!("{} '{}' not found", resource, id)),
            Self::Conflict(message) => ("conflict", message),
            Self::Upstream(message) => {
                tracing::warn!("Upstream error: {}", message);
                ("upstream_error", message)
            }
            Self::Database(e) => {
                tracing::error!("Database error: {}", e);
                ("internal_error", "an internal error occurred".to_string())
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                ("internal_error", "an internal error occurred".to_string())
            }
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict(message) => Self::Conflict(message),
            _ => Self::Database(e),
        }
    }
}

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        Self::Upstream(e.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Source { .. } | SyncError::RateLimited { .. } => Self::Upstream(e.to_string()),
            SyncError::Config { reason } => Self::BadRequest(reason),
            _ => Self::internal(e.to_string()),
        }
    }
}
