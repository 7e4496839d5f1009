//! API error type and its JSON rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use moviedb::DbError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request that never reached the query builder (bad path id,
    /// unparsable JSON body, missing query parameter).
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn parts(&self) -> (StatusCode, &'static str, String) {
        let db = match self {
            Self::BadRequest(message) => {
                return (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.clone());
            }
            Self::Db(e) => e,
        };

        match db {
            DbError::InvalidFilterField { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_FILTER_FIELD", db.to_string())
            }
            DbError::InvalidRangeBounds { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_RANGE_BOUNDS", db.to_string())
            }
            DbError::InvalidFilterValue { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_FILTER_VALUE", db.to_string())
            }
            DbError::Validation(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
            }
            DbError::NotFound(message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message.clone()),
            DbError::UniqueViolation(_) => (StatusCode::CONFLICT, "CONFLICT", db.to_string()),
            DbError::ForeignKeyViolation(_) => {
                (StatusCode::BAD_REQUEST, "FOREIGN_KEY_VIOLATION", db.to_string())
            }
            DbError::CheckViolation(_) => {
                (StatusCode::BAD_REQUEST, "CHECK_VIOLATION", db.to_string())
            }
            DbError::Timeout(_) => {
                tracing::error!(error = %db, "query timed out");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TIMEOUT",
                    "Database operation timed out".to_string(),
                )
            }
            _ => {
                tracing::error!(error = ?db, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database operation failed".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();
        let body = ErrorBody {
            success: false,
            error,
            message,
        };
        (status, Json(body)).into_response()
    }
}
