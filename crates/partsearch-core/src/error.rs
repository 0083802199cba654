//! Error types for PartSearch.
//!
//! Per-entry failures during a scan are not errors; they are counted on the
//! scan report. The variants here cover pass-level and query-level failures
//! plus the few conditions that must reach the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the indexing and search core.
#[derive(Debug, Error)]
pub enum PartSearchError {
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Index store is busy: {message}")]
    StoreBusy { message: String },

    #[error("I/O error ({path:?}): {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Registry errors
    #[error("Root registry at {path} is corrupt: {message}")]
    RegistryCorrupt { path: PathBuf, message: String },

    // Indexer errors
    #[error("A scan is already in progress for {root}")]
    ScanInProgress { root: String },

    #[error("Operation cancelled")]
    Cancelled,

    // Search errors
    #[error("Host search unavailable: {0}")]
    HostSearchUnavailable(String),

    #[error("Host search failed: {message}")]
    HostSearchFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for PartSearch operations.
pub type Result<T> = std::result::Result<T, PartSearchError>;

impl From<std::io::Error> for PartSearchError {
    fn from(err: std::io::Error) -> Self {
        PartSearchError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for PartSearchError {
    fn from(err: serde_json::Error) -> Self {
        PartSearchError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for PartSearchError {
    fn from(err: rusqlite::Error) -> Self {
        if is_busy(&err) {
            return PartSearchError::StoreBusy {
                message: err.to_string(),
            };
        }
        PartSearchError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}

impl PartSearchError {
    /// An I/O failure tagged with the path it concerns.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        PartSearchError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Lock contention and interrupted I/O; worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            PartSearchError::StoreBusy { .. } => true,
            PartSearchError::Io {
                source: Some(err), ..
            } => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
