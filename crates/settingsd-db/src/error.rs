//! Error types for the document-database adapter.

use thiserror::Error;

/// Errors raised by the DB contract and its Postgres adapter.
#[derive(Debug, Error)]
pub enum DbError {
    /// The underlying call returned `returnValue: false` or an otherwise
    /// unexpected shape. Treated as transient; the core never retries
    /// locally.
    #[error("database operation {operation} failed")]
    OperationFailed {
        /// Operation identifier (`find`, `merge`, `put`, `del`, `batch`, ...).
        operation: &'static str,
        /// Underlying SQL error, when the failure came from the store.
        #[source]
        source: Option<sqlx::Error>,
    },
    /// A reply could not be decoded into the shape the caller expected.
    #[error("failed to parse database reply for {operation}")]
    ParseError {
        /// Operation identifier.
        operation: &'static str,
        /// Human readable detail.
        detail: String,
    },
    /// A `find` pagination cursor referenced a page that no longer exists.
    #[error("pagination cursor expired")]
    CursorExpired,
    /// Schema migration execution failed.
    #[error("migration failed")]
    MigrationFailed {
        /// Underlying migration error.
        #[source]
        source: sqlx::migrate::MigrateError,
    },
}

/// Convenience alias for results in this crate.
pub type DbResult<T> = Result<T, DbError>;
