//! # API Error Types
//!
//! The last link of the error chain. Every handler returns
//! `Result<_, ApiError>`; axum turns the error into a status code and a
//! JSON body:
//!
//! ```text
//! ValidationError ─► CoreError ─► DbError ─► ApiError ─► (StatusCode, Json)
//!
//! { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for product 7: ..." }
//! ```
//!
//! Server-side failures are logged here with their cause and reach the
//! client with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use stockconnect_core::{CoreError, ValidationError};
use stockconnect_db::DbError;

/// Error body sent to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A server-side failure with a message chosen for the client. The
    /// cause is logged where the error is raised.
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) | ApiError::InsufficientStock(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match self {
            ApiError::Database(cause) => {
                error!(target: "database", error = %cause, "Database error occurred");
                "Database error".to_string()
            }
            ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Validation(msg)
            | ApiError::Conflict(msg)
            | ApiError::InsufficientStock(msg)
            | ApiError::Internal(msg) => msg,
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock { .. } => ApiError::InsufficientStock(err.to_string()),
            CoreError::InvalidStatusTransition { .. } => ApiError::Conflict(err.to_string()),
            CoreError::TotalMismatch { .. } => ApiError::Validation(err.to_string()),
            CoreError::Validation(inner) => inner.into(),
        }
    }
}

/// ## Mapping
/// ```text
/// NotFound            → 404 NOT_FOUND
/// UniqueViolation     → 409 CONFLICT
/// ForeignKeyViolation → 409 CONFLICT
/// Rule(CoreError)     → per CoreError
/// everything else     → 500 DATABASE_ERROR (cause logged)
/// ```
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ApiError::Conflict(err.to_string())
            }
            DbError::Rule(rule) => rule.into(),
            other => ApiError::Database(other.to_string()),
        }
    }
}
