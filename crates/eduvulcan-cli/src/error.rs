//! CLI error types.

use std::fmt;
use std::process::ExitCode;

use eduvulcan_iris::{ApiError, CredentialError, CredentialLoadError};
use eduvulcan_sync::{SinkError, SyncError};

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end a CLI command.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// Session setup failed (token, client, output directory).
    Setup(SyncError),
    /// IO error.
    Io(std::io::Error),
    /// Rendering the output failed.
    Output(String),
    /// Some feeds were not published by a one-shot sync.
    Incomplete { failed: usize },
}

impl CliError {
    /// Process exit code, following sysexits.h.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Setup(SyncError::Config { .. }) => 78,
            Self::Setup(SyncError::CredentialLoad(_)) => 66,
            Self::Setup(SyncError::Credential(_)) => 77,
            Self::Setup(SyncError::Client(_)) => 70,
            Self::Setup(SyncError::Sink(_)) | Self::Io(_) => 74,
            Self::Output(_) => 70,
            Self::Incomplete { .. } => 75,
        }
    }
}

impl From<&CliError> for ExitCode {
    fn from(err: &CliError) -> Self {
        ExitCode::from(err.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Setup(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Output(msg) => write!(f, "output error: {}", msg),
            Self::Incomplete { failed } => {
                write!(f, "sync incomplete: {} feed(s) not published", failed)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Setup(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        Self::Setup(err)
    }
}

impl From<CredentialLoadError> for CliError {
    fn from(err: CredentialLoadError) -> Self {
        Self::Setup(err.into())
    }
}

impl From<CredentialError> for CliError {
    fn from(err: CredentialError) -> Self {
        Self::Setup(err.into())
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        Self::Setup(err.into())
    }
}

impl From<SinkError> for CliError {
    fn from(err: SinkError) -> Self {
        Self::Setup(err.into())
    }
}
