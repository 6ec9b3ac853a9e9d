use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("failed to read credential file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credential file is malformed: {0}")]
    Parse(#[source] serde_json::Error),
    #[error(
        "credential file has no \"database_secret\", \"access_token\" or service-account key"
    )]
    Missing,
}

/// Token endpoint used when a key file does not name one.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The parts of a Google service-account key file needed to mint tokens.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    /// PKCS#8 PEM.
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Pre-provisioned service credential for the realtime database REST API.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Legacy database secret or ID token, sent as `auth=`.
    DatabaseSecret(String),
    /// OAuth2 access token, sent as `access_token=`.
    AccessToken(String),
    /// Service-account key; access tokens are minted from it on demand.
    ServiceAccount(ServiceAccountKey),
}

#[derive(Deserialize)]
struct CredentialFile {
    #[serde(rename = "type")]
    kind: Option<String>,
    database_secret: Option<String>,
    access_token: Option<String>,
}

impl Credential {
    pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let json = fs::read_to_string(path).map_err(|e| CredentialError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        let file: CredentialFile = serde_json::from_str(json).map_err(CredentialError::Parse)?;
        if let Some(token) = file.access_token.filter(|t| !t.is_empty()) {
            return Ok(Credential::AccessToken(token));
        }
        if let Some(secret) = file.database_secret.filter(|s| !s.is_empty()) {
            return Ok(Credential::DatabaseSecret(secret));
        }
        if file.kind.as_deref() == Some("service_account") {
            let key: ServiceAccountKey =
                serde_json::from_str(json).map_err(CredentialError::Parse)?;
            return Ok(Credential::ServiceAccount(key));
        }
        Err(CredentialError::Missing)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::DatabaseSecret(_) => write!(f, "DatabaseSecret(<redacted>)"),
            Credential::AccessToken(_) => write!(f, "AccessToken(<redacted>)"),
            Credential::ServiceAccount(key) => write!(f, "ServiceAccount({})", key.client_email),
        }
    }
}
