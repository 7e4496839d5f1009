//! Error types for moviedb

use thiserror::Error;

/// Result type alias for moviedb operations
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised while building or executing entity queries.
///
/// The first group (`InvalidFilterField` through `Validation`) describes a
/// malformed client request; see [`DbError::is_client_error`]. Everything
/// else comes from the storage layer and is opaque to the query builder.
#[derive(Debug, Error)]
pub enum DbError {
    /// Filtering was requested on a field outside the entity's allow-list.
    #[error("field '{field}' is not filterable on {entity}")]
    InvalidFilterField { entity: String, field: String },

    /// A range filter is missing a bound or a bound does not parse for the field type.
    #[error("invalid range bounds for '{field}': {reason}")]
    InvalidRangeBounds { field: String, reason: String },

    /// An exact-match value does not parse for the field type.
    #[error("invalid value for '{field}': {reason}")]
    InvalidFilterValue { field: String, reason: String },

    /// Payload or identifier validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create an invalid filter field error
    pub fn invalid_filter_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidFilterField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an invalid range bounds error
    pub fn invalid_range(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRangeBounds {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid filter value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilterValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error was caused by the request rather than the server.
    ///
    /// Constraint violations count as client errors: they are triggered by
    /// payload values (a duplicate key, an unknown `director_id`).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFilterField { .. }
                | Self::InvalidRangeBounds { .. }
                | Self::InvalidFilterValue { .. }
                | Self::Validation(_)
                | Self::UniqueViolation(_)
                | Self::ForeignKeyViolation(_)
                | Self::CheckViolation(_)
        )
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Parse a tokio_postgres error into a more specific DbError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let mapped = Self::from_sqlstate(db_err.code().code(), constraint, db_err.message());
            if let Some(mapped) = mapped {
                return mapped;
            }
        }
        Self::Query(err)
    }

    fn from_sqlstate(code: &str, constraint: &str, message: &str) -> Option<Self> {
        let mapped = match code {
            "23505" => Self::UniqueViolation(format!("{constraint}: {message}")),
            "23503" => Self::ForeignKeyViolation(format!("{constraint}: {message}")),
            "23514" => Self::CheckViolation(format!("{constraint}: {message}")),
            // string_data_right_truncation, numeric_value_out_of_range,
            // character_not_in_repertoire
            "22001" | "22003" | "22021" => Self::Validation(message.to_string()),
            _ => return None,
        };
        Some(mapped)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
