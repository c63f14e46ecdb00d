//! Error types for the entitlement ledger.

use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur in ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error from SQLite. Row-to-record conversion failures also
    /// land here, wrapped by rusqlite; a malformed row is treated as
    /// corruption, never silently defaulted.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A targeted record does not exist (update or lookup by id/hash).
    #[error("record not found: {0}")]
    NotFound(String),
}
