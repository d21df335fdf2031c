//! Token source double for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;

use super::error::AuthError;
use super::source::TokenSource;
use super::store::Credential;

/// Issues `token-1`, `token-2`, ... and counts acquisitions.
#[derive(Clone)]
pub(crate) struct CountingTokenSource {
    count: Arc<AtomicUsize>,
    lifetime_secs: i64,
    delay: Duration,
    failure: Option<AuthError>,
}

impl CountingTokenSource {
    pub(crate) fn new() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            lifetime_secs: 3600,
            delay: Duration::ZERO,
            failure: None,
        }
    }

    /// Every acquisition fails with `error`.
    pub(crate) fn failing(error: AuthError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new()
        }
    }

    pub(crate) fn with_lifetime_secs(mut self, secs: i64) -> Self {
        self.lifetime_secs = secs;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn acquisitions(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl TokenSource for CountingTokenSource {
    async fn acquire(&self) -> Result<Credential, AuthError> {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(Credential::expiring_in(
            format!("token-{n}"),
            self.lifetime_secs,
            Utc::now(),
        ))
    }
}
