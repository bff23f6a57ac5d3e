//! Error types for the entity cache.

use tavern_db::DbError;

/// Errors returned by row lookups and row setters.
///
/// Whatever the variant, a failed setter leaves the cached row and the
/// backend row as they were before the call.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend failed to load or persist the row.
    #[error("backend unavailable: {0}")]
    Backend(#[from] DbError),

    /// The new value violates a field invariant.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// The field being set.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A counter would exceed its maximum.
    #[error("{field} would overflow")]
    Overflow {
        /// The counter that overflowed.
        field: &'static str,
    },

    /// The task performing the write-through panicked or was shut down
    /// with the runtime.
    #[error("write-through task aborted: {0}")]
    WriteAborted(String),
}
