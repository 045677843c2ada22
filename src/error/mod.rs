//! Error types and Result aliases for Folio.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using Folio's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Folio operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Directory scan error.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

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
    /// Failed to create the change-notification subscription.
    #[error("failed to initialize watcher: {0}")]
    InitFailed(String),

    /// Failed to watch a path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },
}

/// Reconciliation scan errors.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The root directory could not be enumerated at all.
    #[error("failed to enumerate '{path}': {reason}")]
    Enumeration { path: String, reason: String },

    /// The scan was superseded by a newer request.
    #[error("scan cancelled")]
    Cancelled,
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

impl ScanError {
    /// Create an enumeration-failure error for a root path.
    pub fn enumeration(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Enumeration {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}
