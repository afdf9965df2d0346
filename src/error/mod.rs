//! Error types and Result aliases for pathscout.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using pathscout's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pathscout operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// File watching, scanning or per-path processing error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// Failed to enumerate a directory subtree.
    #[error("failed to scan '{path}': {reason}")]
    ScanFailed { path: String, reason: String },

    /// File processing error.
    #[error("failed to process file '{path}': {reason}")]
    ProcessFailed { path: String, reason: String },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl WatcherError {
    /// Create a watch registration error.
    pub fn watch_failed(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::WatchFailed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a subtree enumeration error.
    pub fn scan_failed(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::ScanFailed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a per-file processing error.
    pub fn process_failed(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::ProcessFailed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
