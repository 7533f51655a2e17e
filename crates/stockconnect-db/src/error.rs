//! # Store Errors
//!
//! Everything the store can refuse or fail with. Business refusals raised
//! inside a transaction (stock floor, illegal status move) travel as
//! [`DbError::Rule`] so the API can answer 409 instead of 500.
//!
//! ```text
//! sqlx::Error ──► classify ──┬─ RowNotFound ──────────────► NotFound
//!                            ├─ "UNIQUE constraint" ──────► UniqueViolation { field }
//!                            ├─ "FOREIGN KEY constraint" ─► ForeignKeyViolation
//!                            ├─ pool timed out / closed ──► PoolExhausted / ConnectionFailed
//!                            └─ anything else ────────────► QueryFailed / Internal
//!
//! CoreError (stock floor, status machine) ──────────────► Rule(CoreError)
//! ```
//!
//! An `Err` from inside an open transaction drops it, which rolls back.

use stockconnect_core::CoreError;
use thiserror::Error;

const UNIQUE_PREFIX: &str = "UNIQUE constraint failed: ";
const FOREIGN_KEY_MARKER: &str = "FOREIGN KEY constraint failed";

#[derive(Debug, Error)]
pub enum DbError {
    /// No row with this id for the calling business. A row owned by another
    /// business is reported the same way.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A per-business unique column (barcode) already holds this value.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// The row is still referenced, e.g. a product with order history.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error(transparent)]
    Rule(#[from] CoreError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// A begin or commit failure.
    pub fn transaction(err: sqlx::Error) -> Self {
        DbError::TransactionFailed(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// Column named in a SQLite UNIQUE failure: `"products.business_id,
/// products.barcode"` gives `"barcode"`.
fn unique_column(message: &str) -> String {
    message
        .split(UNIQUE_PREFIX)
        .nth(1)
        .and_then(|cols| cols.split(',').last())
        .and_then(|col| col.trim().rsplit('.').next())
        .filter(|col| !col.is_empty())
        .unwrap_or("value")
        .to_string()
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                if message.starts_with(UNIQUE_PREFIX) {
                    DbError::duplicate(unique_column(message), "unknown")
                } else if message.contains(FOREIGN_KEY_MARKER) {
                    DbError::ForeignKeyViolation {
                        message: message.to_string(),
                    }
                } else {
                    DbError::QueryFailed(message.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_errors_pass_through() {
        let err: DbError = CoreError::InsufficientStock {
            product_id: 3,
            available: 1,
            requested: 4,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 3: available 1, requested 4"
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
        assert!(DbError::not_found("Order", 42).to_string().contains("42"));
    }

    #[test]
    fn test_unique_column_from_sqlite_message() {
        assert_eq!(
            unique_column("UNIQUE constraint failed: products.business_id, products.barcode"),
            "barcode"
        );
        assert_eq!(unique_column("UNIQUE constraint failed: businesses.name"), "name");
        assert_eq!(unique_column("something else"), "value");
    }
}
