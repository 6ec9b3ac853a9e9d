//! OAuth2 access tokens minted from a service-account key (JWT bearer grant).
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::credential::ServiceAccountKey;

/// Scopes the realtime database REST API accepts for service accounts.
pub const FIREBASE_DATABASE_SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion (Google's maximum).
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// A cached token is replaced this long before it expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("service-account private key is not a valid RSA PEM: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign token assertion: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("system clock is before the Unix epoch")]
    Clock(#[source] std::time::SystemTimeError),
    #[error("token request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("token request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Mints and caches access tokens for one service account.
pub struct AccessTokenSource {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    client: reqwest::blocking::Client,
    cached: Option<CachedToken>,
}

impl AccessTokenSource {
    /// Parses the private key up front so a broken key fails at startup.
    pub fn new(key: ServiceAccountKey, client: reqwest::blocking::Client) -> Result<Self, TokenError> {
        let signing_key =
            EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(TokenError::InvalidKey)?;
        Ok(Self {
            key,
            signing_key,
            client,
            cached: None,
        })
    }

    /// A valid access token, minting a new one when none is cached or the
    /// cached one is about to expire.
    pub fn token(&mut self) -> Result<String, TokenError> {
        let cached = match self.cached.take() {
            Some(cached) if Instant::now() < cached.refresh_at => cached,
            _ => self.mint()?,
        };
        let value = cached.value.clone();
        self.cached = Some(cached);
        Ok(value)
    }

    fn mint(&self) -> Result<CachedToken, TokenError> {
        let issued_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(TokenError::Clock)?
            .as_secs();
        let assertion = self.assertion(issued_at)?;
        let requested = Instant::now();

        let request_err = |source| TokenError::Request {
            url: self.key.token_uri.clone(),
            source,
        };
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Rejected {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        let token: TokenResponse = response.json().map_err(request_err)?;
        log::debug!(
            "Minted access token for {} (expires in {}s)",
            self.key.client_email,
            token.expires_in
        );

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(REFRESH_MARGIN);
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: requested + lifetime,
        })
    }

    /// RS256-signed JWT asserting the service account's identity.
    fn assertion(&self, issued_at: u64) -> Result<String, TokenError> {
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: FIREBASE_DATABASE_SCOPES.to_string(),
            aud: self.key.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(TokenError::Sign)
    }
}
