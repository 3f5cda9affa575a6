//! Store error types

use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("User already exists: {0}")]
    DuplicateEmail(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid persisted data: {0}")]
    InvalidData(String),

    #[error("Database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Blocking store call failed: {0}")]
    Worker(String),
}

impl StoreError {
    /// Check if this error was caused by the caller's input rather than the store
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, StoreError::DuplicateEmail(_) | StoreError::InvalidRecord(_))
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
