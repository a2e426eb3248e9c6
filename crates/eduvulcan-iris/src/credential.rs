//! Token validation.
//!
//! The integration is driven by a token file (`eduvulcan_token.json`) that
//! holds the Iris JWT, the tenant symbol and the decoded JWT claims. Before
//! any network access the bundle is checked for the required fields and for
//! the premium capability; the resulting [`ValidatedCredential`] is then
//! owned by the API client for the rest of the process lifetime.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use thiserror::Error;

/// Capability marker required in the token claims.
pub const PREMIUM_CAPABILITY: &str = "EDUVULCAN_PREMIUM";

/// Why a credential bundle was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// `jwt` or `tenant` is absent or blank.
    #[error("token is missing required field `{0}`")]
    MissingField(&'static str),

    /// The claims do not grant the premium capability.
    #[error("token lacks the `{0}` capability (premium required)")]
    MissingCapability(&'static str),

    /// The claims could not be decoded.
    #[error("malformed token: {0}")]
    MalformedToken(String),
}

/// Errors reading a token file from disk.
#[derive(Debug, Error)]
pub enum CredentialLoadError {
    /// The file could not be read.
    #[error("failed to read token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON of the expected shape.
    #[error("failed to parse token file: {0}")]
    Json(#[from] serde_json::Error),
}

/// The credential bundle as stored in the token file.
///
/// Nothing is checked at this stage; see [`validate`].
#[derive(Clone, Default, Deserialize)]
pub struct CredentialBundle {
    /// The Iris bearer token.
    #[serde(default)]
    pub jwt: Option<String>,
    /// The tenant (school group) symbol.
    #[serde(default)]
    pub tenant: Option<String>,
    /// Decoded JWT claims. When absent, the claims are read from the JWT itself.
    #[serde(default)]
    pub jwt_payload: Option<serde_json::Value>,
}

impl CredentialBundle {
    /// Creates a bundle from its parts.
    pub fn new(jwt: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            jwt: Some(jwt.into()),
            tenant: Some(tenant.into()),
            jwt_payload: None,
        }
    }

    /// Builder method to set explicit claims.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.jwt_payload = Some(payload);
        self
    }

    /// Parses a bundle from the token file contents.
    pub fn from_json(json: &str) -> Result<Self, CredentialLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a token file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CredentialLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("jwt", &self.jwt.as_ref().map(|_| "<redacted>"))
            .field("tenant", &self.tenant)
            .field("jwt_payload", &self.jwt_payload.is_some())
            .finish()
    }
}

/// A credential that passed validation.
///
/// Immutable; handed to the API client at construction.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedCredential {
    jwt: String,
    tenant: String,
    capabilities: BTreeSet<String>,
    name: Option<String>,
    uid: Option<String>,
}

impl ValidatedCredential {
    /// The bearer token.
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    /// The tenant symbol.
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Capabilities granted by the token.
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    /// Pupil display name from the claims, if present.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Account identifier from the claims, if present.
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }
}

impl fmt::Debug for ValidatedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedCredential")
            .field("jwt", &"<redacted>")
            .field("tenant", &self.tenant)
            .field("capabilities", &self.capabilities)
            .field("name", &self.name)
            .field("uid", &self.uid)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    uid: Option<ClaimId>,
    #[serde(default)]
    caps: Option<Capabilities>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClaimId {
    Text(String),
    Number(i64),
}

impl ClaimId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// `caps` is either a list or, as issued by eduVULCAN, a string holding a
/// JSON-encoded list (`"[\"EDUVULCAN_PREMIUM\"]"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Capabilities {
    List(Vec<String>),
    Encoded(String),
}

impl Capabilities {
    fn into_set(self) -> Result<BTreeSet<String>, CredentialError> {
        match self {
            Self::List(caps) => Ok(caps.into_iter().collect()),
            Self::Encoded(raw) => serde_json::from_str::<Vec<String>>(&raw)
                .map(|caps| caps.into_iter().collect())
                .map_err(|e| CredentialError::MalformedToken(format!("invalid caps claim: {}", e))),
        }
    }
}

/// Validates a credential bundle.
///
/// Checks, in order: `jwt` and `tenant` are present and non-blank, the
/// claims decode, and the claims grant [`PREMIUM_CAPABILITY`].
pub fn validate(bundle: &CredentialBundle) -> Result<ValidatedCredential, CredentialError> {
    let jwt = required(bundle.jwt.as_deref(), "jwt")?;
    let tenant = required(bundle.tenant.as_deref(), "tenant")?;

    let claims = match bundle.jwt_payload {
        Some(ref payload) => serde_json::from_value::<TokenClaims>(payload.clone())
            .map_err(|e| CredentialError::MalformedToken(format!("invalid jwt_payload: {}", e)))?,
        None => decode_claims(jwt)?,
    };

    let capabilities = match claims.caps {
        Some(caps) => caps.into_set()?,
        None => BTreeSet::new(),
    };
    if !capabilities.contains(PREMIUM_CAPABILITY) {
        return Err(CredentialError::MissingCapability(PREMIUM_CAPABILITY));
    }

    Ok(ValidatedCredential {
        jwt: jwt.to_string(),
        tenant: tenant.to_string(),
        capabilities,
        name: claims.name.filter(|n| !n.trim().is_empty()),
        uid: claims.uid.map(ClaimId::into_string),
    })
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, CredentialError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CredentialError::MissingField(field)),
    }
}

/// Decodes the payload segment of a JWT without verifying its signature.
fn decode_claims(jwt: &str) -> Result<TokenClaims, CredentialError> {
    let mut segments = jwt.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) if !payload.is_empty() => payload,
        _ => {
            return Err(CredentialError::MalformedToken(
                "jwt has no payload segment".to_string(),
            ));
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| CredentialError::MalformedToken(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| CredentialError::MalformedToken(format!("payload is not JSON claims: {}", e)))
}
