//! Sync error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use eduvulcan_iris::{ApiError, CredentialError, CredentialLoadError};

/// Result type for setup operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that prevent a sync session from being set up.
///
/// Failures of individual passes never surface here; they are reported per
/// feed in the tick report.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The token file could not be read.
    #[error("failed to load token: {0}")]
    CredentialLoad(#[from] CredentialLoadError),

    /// The token was rejected before any network access.
    #[error("invalid token: {0}")]
    Credential(#[from] CredentialError),

    /// The API client could not be built.
    #[error("failed to create Iris client: {0}")]
    Client(#[from] ApiError),

    /// The calendar sink could not be set up.
    #[error("calendar sink error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SyncError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Errors raised by a [`CalendarSink`](crate::CalendarSink).
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing the published calendar failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Serializing the published calendar failed.
    #[error("failed to serialize events: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SinkError {
    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
