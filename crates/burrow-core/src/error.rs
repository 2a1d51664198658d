//! Error types for the folder registry.
//!
//! Internal operations return [`Result`] and propagate with `?`. The
//! best-effort public entry points on [`crate::FolderRegistry`] catch these at
//! the boundary and log them instead of returning them.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for burrow operations.
#[derive(Debug, Error)]
pub enum BurrowError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Logical path validation
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Path escapes the sandbox root: {0}")]
    PathEscapesRoot(String),

    #[error("Path is reserved for registry metadata: {0}")]
    ReservedPath(String),

    // Synchronization
    #[error("Registry lock poisoned by a panicking thread")]
    LockPoisoned,
}

/// Result type alias for burrow operations.
pub type Result<T> = std::result::Result<T, BurrowError>;

impl From<std::io::Error> for BurrowError {
    fn from(err: std::io::Error) -> Self {
        BurrowError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BurrowError {
    fn from(err: serde_json::Error) -> Self {
        BurrowError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl BurrowError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BurrowError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }
}
