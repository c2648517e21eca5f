//! Error types for the PostgreSQL document store.

use sqlx_core::error::Error as SqlxError;
use strata_storage::StorageError;

/// Errors specific to the PostgreSQL backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

/// Map a query error onto the storage error taxonomy.
///
/// Unique violations on insert become [`StorageError::DuplicateKey`].
pub(crate) fn map_query_error(
    err: SqlxError,
    collection: &str,
    document_key: &str,
) -> StorageError {
    match err {
        SqlxError::Database(ref db_err) if db_err.is_unique_violation() => {
            StorageError::duplicate_key(collection, document_key)
        }
        SqlxError::Io(_) | SqlxError::PoolTimedOut | SqlxError::PoolClosed => {
            StorageError::connection_error(err.to_string())
        }
        other => StorageError::internal(format!(
            "Query on {collection}/{document_key} failed: {other}"
        )),
    }
}
