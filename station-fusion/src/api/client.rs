//! DPClim API client with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::auth::{AuthError, TokenSource, TokenStore};

use super::error::ApiError;
use super::limiter::RateLimiter;
use super::transport::{Transport, TransportResponse};

/// Default base URL for the DPClim API.
pub const DEFAULT_BASE_URL: &str = "https://public-api.meteofrance.fr/public/DPClim/v1";

/// Retry limits per error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after `401`/`403`, each with a freshly acquired token.
    pub max_auth_retries: u32,
    /// Retries after `429`.
    pub max_rate_limit_retries: u32,
    /// Wait used when `Retry-After` is absent or unparseable.
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_auth_retries: 1,
            max_rate_limit_retries: 3,
            default_retry_after: Duration::from_secs(60),
        }
    }
}

/// Result of a successful logical call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// `2xx` with a JSON body
    Json(serde_json::Value),
    /// `204 No Content`
    NoContent,
}

/// How one HTTP exchange moves the call forward.
#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Success,
    NoContent,
    Unauthorized(u16),
    RateLimited(Option<Duration>),
    Failed(u16),
}

impl Outcome {
    fn classify(response: &TransportResponse) -> Self {
        match response.status {
            204 => Outcome::NoContent,
            200..=299 => Outcome::Success,
            401 | 403 => Outcome::Unauthorized(response.status),
            429 => Outcome::RateLimited(response.retry_after.as_deref().and_then(parse_retry_after)),
            status => Outcome::Failed(status),
        }
    }
}

/// Parse a `Retry-After` value given in (possibly fractional) seconds.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// Authenticated, rate-limited client.
///
/// The token store and limiter are shared handles so several clients (or
/// concurrent calls on one client) respect the same token and ceiling.
pub struct ApiClient<T, S> {
    transport: T,
    tokens: Arc<TokenStore<S>>,
    limiter: Arc<RateLimiter>,
    base_url: String,
    policy: RetryPolicy,
}

impl<T: Transport, S: TokenSource> ApiClient<T, S> {
    /// Create a client against the default DPClim base URL.
    pub fn new(transport: T, tokens: Arc<TokenStore<S>>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            transport,
            tokens,
            limiter,
            base_url: DEFAULT_BASE_URL.to_string(),
            policy: RetryPolicy::default(),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `endpoint` with `params`, applying the retry policy.
    ///
    /// Every terminal failure is returned; nothing is swallowed.
    pub async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), endpoint);
        let mut auth_retries = 0;
        let mut rate_limit_retries = 0;

        loop {
            self.limiter.acquire().await;
            let credential = self.tokens.get_credential().await?;
            let response = self
                .transport
                .get(&url, params, credential.access_token())
                .await?;

            match Outcome::classify(&response) {
                Outcome::Success => return parse_body(response.body),
                Outcome::NoContent => {
                    debug!(url = %url, "204 No Content");
                    return Ok(ApiResponse::NoContent);
                }
                Outcome::Unauthorized(status) => {
                    if auth_retries >= self.policy.max_auth_retries {
                        return Err(ApiError::Auth(AuthError::Rejected { status }));
                    }
                    auth_retries += 1;
                    warn!(url = %url, status, "credential rejected, refreshing token");
                    self.tokens.invalidate().await;
                }
                Outcome::RateLimited(retry_after) => {
                    if rate_limit_retries >= self.policy.max_rate_limit_retries {
                        return Err(ApiError::RateLimited {
                            attempts: rate_limit_retries + 1,
                        });
                    }
                    rate_limit_retries += 1;
                    let delay = retry_after.unwrap_or(self.policy.default_retry_after);
                    warn!(
                        url = %url,
                        delay_secs = delay.as_secs_f64(),
                        attempt = rate_limit_retries,
                        "429 Too Many Requests, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Outcome::Failed(status) => {
                    return Err(ApiError::Transport {
                        status: Some(status),
                        message: response.body.chars().take(500).collect(),
                    });
                }
            }
        }
    }
}

fn parse_body(body: String) -> Result<ApiResponse, ApiError> {
    serde_json::from_str(&body)
        .map(ApiResponse::Json)
        .map_err(|e| ApiError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
}
