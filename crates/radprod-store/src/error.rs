//! Error types for the persistence boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from store operations.
///
/// Concurrent first-sight races on mappings and rules are not represented
/// here: upsert-if-absent operations resolve them internally and return the
/// surviving row, so callers never see a constraint violation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Upload id does not exist.
    #[error("upload not found: {id}")]
    UploadNotFound { id: u64 },

    /// SLA rule id does not exist.
    #[error("SLA rule not found: {id}")]
    RuleNotFound { id: u64 },

    /// Attempt to change an upload's status after a terminal state was set.
    #[error("upload {id} already in terminal state {status}")]
    AlreadyTerminal { id: u64, status: String },

    /// Failed to read or write the backing state file.
    #[error("failed to access state file {path}: {source}")]
    StateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file exists but is not parseable.
    #[error("failed to parse state file {path}: {message}")]
    StateParse { path: PathBuf, message: String },

    /// Backend-specific failure (used by test doubles and future backends).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
