//! Error types for session persistence and the host binary.

use std::path::PathBuf;

/// Write-side failures of a [`SessionStore`](crate::store::SessionStore).
///
/// Read-side problems never surface: a missing or corrupt record loads as
/// "no session".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to serialize session state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("session database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config write failed: {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures of the completed-workout log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("workout log I/O error: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workout log CSV error: {0}")]
    Csv(#[from] csv::Error),
}
