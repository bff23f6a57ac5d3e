//! Error types for the storage layer.
//!
//! Every backend failure surfaces as a [`DbError`]. Backends never retry;
//! the error reaches the caller unchanged and callers treat any variant as
//! "backend unavailable" for the operation that triggered it.

/// Errors that can occur in a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A SQL operation failed (connection, query, or transaction).
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The backend refused the operation (e.g. the in-memory backend was
    /// switched offline).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
