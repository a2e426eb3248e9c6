//! eduvulcan-iris: access to the EduVulcan Iris API.
//!
//! - [`credential`]: token file loading and premium validation
//! - [`client`]: the reqwest-based [`IrisClient`]
//! - [`normalize`]: conversion of raw records into calendar events

pub mod api;
pub mod client;
pub mod credential;
pub mod error;
pub mod normalize;
pub mod records;

pub use api::{BoxFuture, IrisApi};
pub use client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, IrisClient};
pub use credential::{
    CredentialBundle, CredentialError, CredentialLoadError, PREMIUM_CAPABILITY,
    ValidatedCredential, validate,
};
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use normalize::{
    DEFAULT_TIMEZONE, NormalizationWarning, NormalizeContext, NormalizedFeed, WarningReason,
    normalize, normalize_feed,
};
pub use records::{Account, IrisDate, IrisId, RawRecord};
