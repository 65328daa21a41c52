//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)      CoreError / ValidationError           │
//! │       │                                │                                │
//! │       ▼                                ▼                                │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbErrorKind ← ConstraintViolation | NotFound | Validation | Storage   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Router builds a FAILURE envelope with the matching code               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use stockhub_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and for the failure response sent to clients.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Update or delete of an id that doesn't exist
    /// - Stock movement against a missing product
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a row with an id that is already taken
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Inventory row referencing a non-existent product_id
    /// - Deleting a product that still has inventory rows
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Input rejected before reaching the store.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A compare-and-set update found the row changed underneath it.
    ///
    /// ## When This Occurs
    /// - Another connection moved stock for the same product between the
    ///   read and the write of a movement
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Coarse classification used for wire error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    ConstraintViolation,
    NotFound,
    Validation,
    Storage,
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Classifies this error.
    pub fn kind(&self) -> DbErrorKind {
        match self {
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                DbErrorKind::ConstraintViolation
            }
            DbError::NotFound { .. } => DbErrorKind::NotFound,
            DbError::Validation(_) => DbErrorKind::Validation,
            DbError::Conflict { .. }
            | DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => DbErrorKind::Storage,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed")
                    || msg.contains("PRIMARY KEY constraint failed")
                {
                    let field = msg
                        .split("constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::Validation(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Validation(err.to_string())
    }
}

impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => DbError::not_found("Product", id),
            CoreError::InventoryItemNotFound(id) => DbError::not_found("Inventory item", id),
            CoreError::StockOverflow { .. } => DbError::Validation(err.to_string()),
            CoreError::Validation(inner) => inner.into(),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let fk = DbError::ForeignKeyViolation {
            message: "FOREIGN KEY constraint failed".to_string(),
        };
        assert_eq!(fk.kind(), DbErrorKind::ConstraintViolation);
        assert_eq!(DbError::not_found("Product", 9).kind(), DbErrorKind::NotFound);
        assert_eq!(DbError::conflict("Product", 9).kind(), DbErrorKind::Storage);
        assert_eq!(DbError::PoolExhausted.kind(), DbErrorKind::Storage);
    }

    #[test]
    fn test_core_error_conversion() {
        let err: DbError = CoreError::StockOverflow {
            on_hand: 1,
            requested: 2,
        }
        .into();
        assert_eq!(err.kind(), DbErrorKind::Validation);

        let err: DbError = CoreError::ProductNotFound(4).into();
        assert_eq!(err.to_string(), "Product not found: 4");
    }
}
