//! The [`IrisApi`] trait.
//!
//! The sync coordinator talks to Iris only through this trait, so tests can
//! swap in a scripted implementation.

use std::future::Future;
use std::pin::Pin;

use eduvulcan_core::{DateWindow, Feed};

use crate::error::ApiResult;
use crate::records::{Account, RawRecord};

/// A boxed future for async trait methods.
///
/// Keeps [`IrisApi`] object-safe so it can live behind `Arc<dyn IrisApi>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read access to the Iris feeds of one pupil.
///
/// Implementations do not retry; retry decisions belong to the caller and
/// are driven by [`ApiErrorKind`](crate::ApiErrorKind).
pub trait IrisApi: Send + Sync {
    /// Returns a short name for logs.
    fn name(&self) -> &str {
        "iris"
    }

    /// Fetches every record of `feed` within `window`, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`](crate::ApiError) classified as unauthorized,
    /// transient or permanent.
    fn fetch<'a>(
        &'a self,
        feed: Feed,
        window: &'a DateWindow,
    ) -> BoxFuture<'a, ApiResult<Vec<RawRecord>>>;

    /// Returns the pupil account, if the implementation knows it.
    ///
    /// The account only enriches event descriptions, so the default
    /// implementation reports none.
    fn account(&self) -> BoxFuture<'_, ApiResult<Option<Account>>> {
        Box::pin(async { Ok(None) })
    }
}
