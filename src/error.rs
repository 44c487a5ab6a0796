//! Centralized error types for threadline.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the threadline library.
///
/// Content-shape problems (odd HTML, unrecognized quoting, unparseable
/// dates) are never errors: the detectors simply report no boundary.
#[derive(Error, Debug)]
pub enum ThreadlineError {
    /// A raw record cannot be normalized at all (e.g. its body is absent).
    ///
    /// Batch operations skip the record and keep going.
    #[error("Invalid record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A records or context file did not deserialize.
    #[error("Malformed JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A record source was asked for a page it cannot produce.
    #[error("Invalid page request: {0}")]
    InvalidPage(String),
}

/// Convenience alias for `Result<T, ThreadlineError>`.
pub type Result<T> = std::result::Result<T, ThreadlineError>;

impl ThreadlineError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Json` variant from a path and a `serde_json::Error`.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Create an `InvalidRecord` variant.
    pub fn invalid_record(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `ThreadlineError::io`).
impl From<std::io::Error> for ThreadlineError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
