//! Token acquisition via the client-credentials grant.

use std::future::Future;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;

use super::error::AuthError;
use super::store::Credential;

/// Default token endpoint for the Météo-France API portal.
pub const DEFAULT_TOKEN_URL: &str = "https://portail-api.meteofrance.fr/token";

/// Lifetime assumed when the endpoint omits `expires_in`: 1 hour.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Something that can mint a fresh bearer credential.
pub trait TokenSource {
    /// Acquire a new credential. Never served from a cache.
    fn acquire(&self) -> impl Future<Output = Result<Credential, AuthError>> + Send;
}

/// Body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Configuration for the client-credentials token source.
#[derive(Debug, Clone)]
pub struct ClientCredentialsConfig {
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Token endpoint URL
    pub token_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ClientCredentialsConfig {
    /// Create a new config with the given client id and secret.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timeout_secs: 30,
        }
    }

    /// Set a custom token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// `Basic` authorization value: base64 of `id:secret`.
    fn basic_authorization(&self) -> String {
        let pair = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", BASE64.encode(pair))
    }
}

/// Acquires tokens by POSTing a client-credentials grant.
#[derive(Debug, Clone)]
pub struct ClientCredentialsSource {
    http: reqwest::Client,
    token_url: String,
}

impl ClientCredentialsSource {
    /// Create a new token source.
    pub fn new(config: ClientCredentialsConfig) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();

        let authorization = HeaderValue::from_str(&config.basic_authorization())
            .map_err(|_| AuthError::InvalidCredentials("not a valid header value"))?;
        headers.insert(AUTHORIZATION, authorization);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::Request {
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            token_url: config.token_url,
        })
    }
}

impl TokenSource for ClientCredentialsSource {
    async fn acquire(&self) -> Result<Credential, AuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AuthError::Request {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await.map_err(|e| AuthError::Request {
            message: e.to_string(),
        })?;

        parse_token_response(&body)
    }
}

/// Turn a token endpoint body into a credential.
fn parse_token_response(body: &str) -> Result<Credential, AuthError> {
    let token: TokenResponse = serde_json::from_str(body).map_err(|e| AuthError::Malformed {
        message: e.to_string(),
    })?;

    if token.access_token.trim().is_empty() {
        return Err(AuthError::Malformed {
            message: "empty access_token".to_string(),
        });
    }

    let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    Ok(Credential::expiring_in(token.access_token, expires_in, Utc::now()))
}
