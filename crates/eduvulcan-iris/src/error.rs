//! Error types for Iris API operations.
//!
//! Every failure of a fetch is classified into one of three kinds that drive
//! the retry decisions of the sync coordinator.

use std::fmt;
use thiserror::Error;

use eduvulcan_core::Feed;

/// The category of an API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The server rejected the token (HTTP 401/403): revoked or expired.
    Unauthorized,
    /// Server error, rate limit, timeout or connection failure. Retryable.
    Transient,
    /// Client error or a response that does not match the expected schema.
    Permanent,
}

impl ApiErrorKind {
    /// Returns true if the operation may be retried within the same pass.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Returns a stable name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to the Iris API.
#[derive(Debug, Error)]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    /// The feed being fetched, if any (account discovery has none).
    feed: Option<Feed>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    /// Creates a new API error with the given kind and message.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            feed: None,
            source: None,
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unauthorized, message)
    }

    /// Creates a transient (retryable) error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transient, message)
    }

    /// Creates a permanent error.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Permanent, message)
    }

    /// Sets the feed this error belongs to.
    pub fn with_feed(mut self, feed: Feed) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the feed, if set.
    pub fn feed(&self) -> Option<Feed> {
        self.feed
    }

    /// Returns true if this error may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(feed) = self.feed {
            write!(f, "[{}] ", feed)?;
        }
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A specialized Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
