//! Error types for writeflow.
//!
//! None of these are fatal: storage errors are logged and swallowed by the
//! persistence adapter, settings errors are turned away at the input boundary.

use std::path::PathBuf;

/// Failures talking to a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("record encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot prepare storage directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Rejected user input for a settings field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("goal must be a positive whole number, got {0:?}")]
    InvalidGoal(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
