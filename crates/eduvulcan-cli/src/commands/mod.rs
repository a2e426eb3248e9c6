//! Subcommand implementations.

pub mod config;
pub mod daemon;
pub mod sync;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use eduvulcan_iris::{CredentialBundle, IrisApi, IrisClient, ValidatedCredential, validate};
use eduvulcan_sync::SyncResult;

use crate::config::AppConfig;

/// Reads and validates the token file. No network access.
pub fn load_credential(path: &Path) -> SyncResult<ValidatedCredential> {
    debug!(path = %path.display(), "loading token file");
    let bundle = CredentialBundle::from_file(path)?;
    let credential = validate(&bundle)?;
    info!(
        tenant = credential.tenant(),
        pupil = credential.name().unwrap_or("unknown"),
        "token validated"
    );
    Ok(credential)
}

/// Builds the Iris client for a validated credential.
pub fn build_client(
    config: &AppConfig,
    credential: ValidatedCredential,
) -> SyncResult<Arc<dyn IrisApi>> {
    let client = IrisClient::new(credential, config.client_config())?;
    Ok(Arc::new(client))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Write;

    /// Writes a premium token file and returns its handle.
    pub fn token_file(caps: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "jwt": "header.payload.signature",
                "tenant": "powiatwulkanowy",
                "jwt_payload": {{ "caps": {}, "name": "Jan Kowalski", "uid": "42" }}
            }}"#,
            caps
        )
        .unwrap();
        file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduvulcan_sync::SyncError;

    #[test]
    fn loads_premium_token() {
        let file = testing::token_file(r#"["EDUVULCAN_PREMIUM"]"#);
        let credential = load_credential(file.path()).unwrap();
        assert_eq!(credential.tenant(), "powiatwulkanowy");
        assert_eq!(credential.name(), Some("Jan Kowalski"));
    }

    #[test]
    fn rejects_token_without_premium() {
        let file = testing::token_file(r#"["EDUVULCAN_BASIC"]"#);
        let err = load_credential(file.path()).unwrap_err();
        assert!(matches!(err, SyncError::Credential(_)));
    }

    #[test]
    fn missing_token_file() {
        let err = load_credential(Path::new("/nonexistent/eduvulcan_token.json")).unwrap_err();
        assert!(matches!(err, SyncError::CredentialLoad(_)));
    }

    #[test]
    fn client_builds_without_network() {
        let file = testing::token_file(r#"["EDUVULCAN_PREMIUM"]"#);
        let credential = load_credential(file.path()).unwrap();
        let client = build_client(&AppConfig::default(), credential).unwrap();
        assert_eq!(client.name(), "iris");
    }
}
