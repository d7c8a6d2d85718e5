//! Error types for workbook ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or normalizing a workbook.
///
/// All of these surface before any persistence happens: a malformed
/// workbook aborts the run with no partial state.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Workbook directory not found or not a directory.
    #[error("workbook directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a sheet file.
    #[error("failed to read sheet file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sheet file is not parseable as CSV.
    #[error("failed to parse sheet {path}: {message}")]
    CsvParse { path: PathBuf, message: String },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
