//! Firebase Realtime Database sink over the REST API.
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;
use thiserror::Error;

use super::credential::{Credential, CredentialError};
use super::service_account::{AccessTokenSource, TokenError};
use crate::telemetry::domain::telemetry_sink::{LiveData, SinkError, TelemetrySink};

/// Upper bound on a single publish so an unreachable sink can't stall the loop.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum InitError {
    #[error("invalid database URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("unusable service-account key: {0}")]
    ServiceAccount(#[source] TokenError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FirebaseConfig {
    pub database_url: String,
    pub credentials_path: PathBuf,
}

/// Handle to one realtime database, created once at startup.
///
/// Construction is side-effect free apart from reading the credential file,
/// so calling [`FirebaseApp::initialize`] twice yields two equivalent
/// handles rather than an error.
pub struct FirebaseApp {
    database_url: Url,
    auth: Auth,
    client: reqwest::blocking::Client,
}

/// How each request is authenticated. Service-account tokens are shared by
/// every reference from the same app.
#[derive(Clone)]
enum Auth {
    Fixed { param: &'static str, value: String },
    ServiceAccount(Arc<Mutex<AccessTokenSource>>),
}

impl Auth {
    fn new(credential: Credential, client: &reqwest::blocking::Client) -> Result<Self, InitError> {
        Ok(match credential {
            Credential::DatabaseSecret(value) => Auth::Fixed {
                param: "auth",
                value,
            },
            Credential::AccessToken(value) => Auth::Fixed {
                param: "access_token",
                value,
            },
            Credential::ServiceAccount(key) => {
                log::debug!("Authenticating as service account {}", key.client_email);
                let tokens =
                    AccessTokenSource::new(key, client.clone()).map_err(InitError::ServiceAccount)?;
                Auth::ServiceAccount(Arc::new(Mutex::new(tokens)))
            }
        })
    }

    /// Query parameter `(name, value)` for the next request.
    fn query_param(&self) -> Result<(&'static str, String), TokenError> {
        match self {
            Auth::Fixed { param, value } => Ok((*param, value.clone())),
            Auth::ServiceAccount(tokens) => {
                let mut tokens = tokens.lock().unwrap_or_else(|e| e.into_inner());
                Ok(("access_token", tokens.token()?))
            }
        }
    }
}

impl FirebaseApp {
    pub fn initialize(config: &FirebaseConfig) -> Result<Self, InitError> {
        let credential = Credential::from_file(&config.credentials_path)?;
        Self::with_credential(&config.database_url, credential)
    }

    pub fn with_credential(database_url: &str, credential: Credential) -> Result<Self, InitError> {
        let database_url = parse_base_url(database_url)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(InitError::Client)?;
        let auth = Auth::new(credential, &client)?;
        log::debug!("Realtime database at {database_url}");
        Ok(Self {
            database_url,
            auth,
            client,
        })
    }

    pub fn database_url(&self) -> &Url {
        &self.database_url
    }

    /// Reference to the document at `path`, e.g. `seminar_hall/live_data`.
    pub fn reference(&self, path: &str) -> DatabaseReference {
        DatabaseReference {
            path: path.trim_matches('/').to_string(),
            database_url: self.database_url.clone(),
            auth: self.auth.clone(),
            client: self.client.clone(),
        }
    }
}

/// A document location; implements [`TelemetrySink`] as a REST `PATCH`.
pub struct DatabaseReference {
    path: String,
    database_url: Url,
    auth: Auth,
    client: reqwest::blocking::Client,
}

impl DatabaseReference {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `<database_url>/<path>.json`, without credentials.
    pub fn endpoint(&self) -> Url {
        let mut url = self.database_url.clone();
        url.set_path(&format!("{}{}.json", self.database_url.path(), self.path));
        url
    }
}

impl TelemetrySink for DatabaseReference {
    fn update(&mut self, data: &LiveData) -> Result<(), SinkError> {
        let (name, value) = self
            .auth
            .query_param()
            .map_err(|e| SinkError::Unauthorized(Box::new(e)))?;
        let mut url = self.endpoint();
        url.query_pairs_mut().append_pair(name, &value);

        let response = self
            .client
            .patch(url)
            .json(data)
            .send()
            .map_err(|e| SinkError::Unreachable(Box::new(e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Parses the database URL, forcing a trailing slash so paths append cleanly.
fn parse_base_url(raw: &str) -> Result<Url, InitError> {
    let invalid = |source| InitError::InvalidUrl {
        url: raw.to_string(),
        source,
    };
    let mut url = Url::parse(raw).map_err(invalid)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
