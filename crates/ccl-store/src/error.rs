use std::io;
use std::path::PathBuf;

/// Errors from ledger storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The snapshot file exists but is not a valid ledger document.
    #[error("corrupt snapshot {path}: {reason}")]
    CorruptSnapshot { path: PathBuf, reason: String },

    /// A complete journal frame failed its integrity check.
    #[error("corrupt journal frame at offset {offset}: {reason}")]
    CorruptJournal { offset: u64, reason: String },

    /// Another process holds the data directory lock.
    #[error("data directory {dir} is locked: {reason}")]
    Locked { dir: PathBuf, reason: String },

    /// The backend refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
