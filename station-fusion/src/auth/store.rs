//! Bearer credential cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::Expiry;
use moka::future::Cache as MokaCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::source::TokenSource;

/// Default safety margin before expiry: 60 seconds.
const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// An access token and the instant it stops being accepted.
///
/// Credentials are never mutated: a stale one is replaced wholesale.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    /// Create a credential expiring at `expires_at`.
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Create a credential from an `expires_in` lifetime relative to `now`.
    pub fn expiring_in(
        access_token: impl Into<String>,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let lifetime = chrono::Duration::try_seconds(expires_in_secs).unwrap_or_default();
        let expires_at = now.checked_add_signed(lifetime).unwrap_or(now);
        Self::new(access_token, expires_at)
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the credential may still be sent at `now`.
    ///
    /// Usable only while `now < expires_at - margin`.
    pub fn is_usable_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.remaining(now, margin) > Duration::ZERO
    }

    /// Time left before the credential must no longer be used.
    fn remaining(&self, now: DateTime<Utc>, margin: Duration) -> Duration {
        let Ok(margin) = chrono::Duration::from_std(margin) else {
            return Duration::ZERO;
        };
        self.expires_at
            .checked_sub_signed(margin)
            .and_then(|deadline| (deadline - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Expires the cached credential `margin` before its own expiry.
struct UntilUnusable {
    margin: Duration,
}

impl Expiry<(), Credential> for UntilUnusable {
    fn expire_after_create(
        &self,
        _key: &(),
        value: &Credential,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.remaining(Utc::now(), self.margin))
    }
}

/// On-disk copy of the last acquired credential.
#[derive(Debug, Clone)]
struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    /// Returns `None` if the file is missing or unreadable.
    fn load(&self) -> Option<Credential> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn save(&self, credential: &Credential) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(credential)?;
        std::fs::write(&self.path, json)
    }

    fn remove(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Owns the current bearer credential.
///
/// Concurrent callers that find no usable credential are coalesced into a
/// single acquisition against the token endpoint.
pub struct TokenStore<S> {
    source: S,
    cache: MokaCache<(), Credential>,
    file: Option<CredentialFile>,
    margin: Duration,
}

impl<S: TokenSource> TokenStore<S> {
    /// Create an in-memory store with the default 60 second safety margin.
    pub fn new(source: S) -> Self {
        Self::with_margin(source, DEFAULT_SAFETY_MARGIN)
    }

    /// Create an in-memory store with a custom safety margin.
    pub fn with_margin(source: S, margin: Duration) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(1)
            .expire_after(UntilUnusable { margin })
            .build();

        Self {
            source,
            cache,
            file: None,
            margin,
        }
    }

    /// Persist acquired credentials to `path` and reuse them on startup.
    pub fn with_persistence(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(CredentialFile { path: path.into() });
        self
    }

    /// Path of the persisted credential, if persistence is enabled.
    pub fn persistence_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path.as_path())
    }

    /// Return a usable credential, acquiring a new one if needed.
    pub async fn get_credential(&self) -> Result<Credential, AuthError> {
        if let Some(cached) = self.cache.get(&()).await {
            if cached.is_usable_at(Utc::now(), self.margin) {
                return Ok(cached);
            }
            self.cache.invalidate(&()).await;
        }

        self.cache
            .try_get_with((), self.load_or_acquire())
            .await
            .map_err(|e: Arc<AuthError>| (*e).clone())
    }

    /// Drop the current credential, in memory and on disk.
    ///
    /// The next `get_credential` call goes to the token endpoint.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
        if let Some(file) = &self.file
            && let Err(e) = file.remove()
        {
            warn!(path = %file.path.display(), error = %e, "failed to remove persisted token");
        }
        info!("token invalidated");
    }

    async fn load_or_acquire(&self) -> Result<Credential, AuthError> {
        if let Some(file) = &self.file
            && let Some(credential) = file.load()
            && credential.is_usable_at(Utc::now(), self.margin)
        {
            debug!(expires_at = %credential.expires_at(), "reusing persisted token");
            return Ok(credential);
        }

        let credential = self.source.acquire().await?;
        info!(expires_at = %credential.expires_at(), "acquired new token");

        if let Some(file) = &self.file
            && let Err(e) = file.save(&credential)
        {
            warn!(path = %file.path.display(), error = %e, "failed to persist token");
        }

        Ok(credential)
    }
}
