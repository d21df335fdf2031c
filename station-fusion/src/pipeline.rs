//! One full run: fetch every partition, then fuse and persist.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, HttpTransport, RateLimiter, Transport};
use crate::auth::{
    AuthError, ClientCredentialsConfig, ClientCredentialsSource, TokenSource, TokenStore,
};
use crate::config::PipelineConfig;
use crate::stations::{
    FetchError, FusionReport, Partition, PartitionStore, Region, Scale, StationFetcher,
    StoreError, fuse, save_canonical,
};

/// Run-level failures.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Token source could not be built
    #[error("failed to set up token source: {0}")]
    Auth(#[from] AuthError),

    /// HTTP transport could not be built
    #[error("failed to set up HTTP client: {0}")]
    Api(#[from] ApiError),

    /// Not a single partition succeeded
    #[error("no partition available ({failed} failed)")]
    NoPartitions { failed: usize },

    /// The canonical dataset could not be written, or stored partitions read
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a successful run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Partitions that fed the fusion
    pub partitions: usize,
    /// Partitions that failed, with the reason
    pub failures: Vec<(Partition, FetchError)>,
    /// The fused dataset
    pub fusion: FusionReport,
    /// Where the canonical dataset was written
    pub canonical_path: PathBuf,
}

/// Fetch-and-fuse pipeline over a transport and token source.
pub struct Pipeline<T, S> {
    fetcher: StationFetcher<T, S>,
    scales: Vec<Scale>,
    regions: Vec<Region>,
    alt_threshold: i64,
    canonical_path: PathBuf,
    skip_fetch: bool,
}

impl Pipeline<HttpTransport, ClientCredentialsSource> {
    /// Wire the production HTTP stack from configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let source = ClientCredentialsSource::new(
            ClientCredentialsConfig::new(&config.client_id, &config.client_secret)
                .with_token_url(&config.token_url)
                .with_timeout(config.timeout_secs),
        )?;
        let tokens = TokenStore::with_margin(source, config.token_margin)
            .with_persistence(config.token_cache.clone());
        let limiter = RateLimiter::per_minute(config.max_requests_per_minute);

        let client = ApiClient::new(
            HttpTransport::new(config.timeout_secs)?,
            Arc::new(tokens),
            Arc::new(limiter),
        )
        .with_base_url(&config.base_url)
        .with_policy(config.retry);

        let fetcher = StationFetcher::new(client, PartitionStore::new(config.raw_dir()))
            .with_max_concurrent(config.max_concurrent);

        Ok(Self::new(fetcher, config))
    }
}

impl<T: Transport, S: TokenSource> Pipeline<T, S> {
    /// Build a pipeline around an existing fetcher.
    pub fn new(fetcher: StationFetcher<T, S>, config: &PipelineConfig) -> Self {
        Self {
            fetcher,
            scales: config.scales.clone(),
            regions: config.regions.clone(),
            alt_threshold: config.alt_threshold,
            canonical_path: config.canonical_path(),
            skip_fetch: config.skip_fetch,
        }
    }

    /// Run once.
    ///
    /// Fusion starts only after every partition has settled. Fails if no
    /// partition is available; an empty canonical dataset is not an error.
    pub async fn run(&self) -> Result<PipelineOutcome, PipelineError> {
        info!(
            alt_threshold = self.alt_threshold,
            scales = ?self.scales,
            regions = ?self.regions,
            skip_fetch = self.skip_fetch,
            "run started"
        );

        let (partitions, failures) = if self.skip_fetch {
            let partitions = self.fetcher.store().load_all()?;
            info!(partitions = partitions.len(), "loaded stored partitions");
            (partitions, Vec::new())
        } else {
            let report = self.fetcher.fetch_all(&self.scales, &self.regions).await;
            for (partition, count) in report.counts() {
                info!(scale = %partition.scale, region = %partition.region, items = count, "count");
            }
            for (scale, total) in report.totals_by_scale() {
                info!(%scale, total_items = total, "count");
            }
            info!(connection_errors = report.failures.len(), "fetch settled");
            (report.partitions, report.failures)
        };

        if partitions.is_empty() {
            return Err(PipelineError::NoPartitions {
                failed: failures.len(),
            });
        }

        let fusion = fuse(&partitions, self.alt_threshold);
        save_canonical(&self.canonical_path, &fusion.stations)?;

        if fusion.stations.is_empty() {
            warn!(path = %self.canonical_path.display(), "canonical dataset is empty");
        }
        info!(
            count = fusion.stations.len(),
            warnings = fusion.warnings.len(),
            path = %self.canonical_path.display(),
            "fusion written"
        );

        Ok(PipelineOutcome {
            partitions: partitions.len(),
            failures,
            fusion,
            canonical_path: self.canonical_path.clone(),
        })
    }
}
