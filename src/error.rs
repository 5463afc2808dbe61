//! Error types for shelfdb
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ShelfError
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Unified error type for shelfdb operations
#[derive(Debug, Error)]
pub enum ShelfError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("validation error: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Value Errors
    // -------------------------------------------------------------------------
    #[error("type conflict for key {key:?}: stored value is not an integer")]
    TypeConflict { key: String },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for ShelfError {
    /// Classifies backing-store failures so callers can branch on category.
    ///
    /// Busy/locked conditions (bounded by the configured busy timeout) map to
    /// [`ShelfError::Unavailable`] - retryable by the caller, not fatal.
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                ShelfError::Unavailable(err.to_string())
            }
            _ => ShelfError::Storage(err.to_string()),
        }
    }
}
