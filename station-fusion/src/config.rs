//! Pipeline configuration.
//!
//! Every setting can come from the environment and has a documented default.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::{DEFAULT_BASE_URL, RetryPolicy};
use crate::auth::DEFAULT_TOKEN_URL;
use crate::stations::{InvalidRegion, InvalidScale, Region, Scale};

/// Errors reading configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A numeric or flag variable could not be parsed
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },

    /// A scale in `METEO_SCALES` is unknown
    #[error(transparent)]
    Scale(#[from] InvalidScale),

    /// A region in `METEO_DEPARTMENTS` is malformed
    #[error(transparent)]
    Region(#[from] InvalidRegion),

    /// A list variable was set but named nothing
    #[error("{0} must list at least one value")]
    EmptyList(&'static str),
}

/// Configuration for a full fetch-and-fuse run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// DPClim API base URL (`METEO_BASE_URL`)
    pub base_url: String,
    /// OAuth2 token endpoint (`METEO_TOKEN_URL`)
    pub token_url: String,
    /// OAuth2 client id (`METEO_CLIENT_ID`)
    pub client_id: String,
    /// OAuth2 client secret (`METEO_CLIENT_SECRET`)
    pub client_secret: String,
    /// Root for raw partitions and the canonical file (`METEO_OUTPUT_DIR`)
    pub output_dir: PathBuf,
    /// Where the bearer token is persisted between runs (`METEO_TOKEN_CACHE`)
    pub token_cache: PathBuf,
    /// Request ceiling per rolling minute (`METEO_MAX_RPM`)
    pub max_requests_per_minute: usize,
    /// Minimum altitude in metres, inclusive (`ALT_SELECT`)
    pub alt_threshold: i64,
    /// Granularities to fetch (`METEO_SCALES`)
    pub scales: Vec<Scale>,
    /// Regions to fetch (`METEO_DEPARTMENTS`)
    pub regions: Vec<Region>,
    /// Partitions in flight at once (`METEO_MAX_CONCURRENT`)
    pub max_concurrent: usize,
    /// HTTP timeout in seconds (`METEO_TIMEOUT_SECS`)
    pub timeout_secs: u64,
    /// Fuse the partitions already on disk instead of fetching (`METEO_SKIP_FETCH`)
    pub skip_fetch: bool,
    /// Token reuse stops this long before expiry
    pub token_margin: Duration,
    /// Retry limits for the API client
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            output_dir: PathBuf::from("data/metadonnees"),
            token_cache: PathBuf::from(".cache/meteo_token.json"),
            max_requests_per_minute: 50,
            alt_threshold: 1000,
            scales: vec![Scale::Quotidienne],
            regions: ["38", "73", "74"]
                .iter()
                .filter_map(|code| Region::parse(code).ok())
                .collect(),
            max_concurrent: 1,
            timeout_secs: 30,
            skip_fetch: false,
            token_margin: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`; unset or blank values keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("METEO_BASE_URL") {
            config.base_url = v;
        }
        if let Some(v) = get("METEO_TOKEN_URL") {
            config.token_url = v;
        }
        if let Some(v) = get("METEO_CLIENT_ID") {
            config.client_id = v;
        }
        if let Some(v) = get("METEO_CLIENT_SECRET") {
            config.client_secret = v;
        }
        if let Some(v) = get("METEO_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("METEO_TOKEN_CACHE") {
            config.token_cache = PathBuf::from(v);
        }
        if let Some(v) = get("METEO_MAX_RPM") {
            config.max_requests_per_minute = parse_number("METEO_MAX_RPM", &v)?;
        }
        if let Some(v) = get("ALT_SELECT") {
            config.alt_threshold = parse_number("ALT_SELECT", &v)?;
        }
        if let Some(v) = get("METEO_SCALES") {
            config.scales = parse_list("METEO_SCALES", &v, Scale::parse)?;
        }
        if let Some(v) = get("METEO_DEPARTMENTS") {
            config.regions = parse_list("METEO_DEPARTMENTS", &v, Region::parse)?;
        }
        if let Some(v) = get("METEO_MAX_CONCURRENT") {
            config.max_concurrent = parse_number("METEO_MAX_CONCURRENT", &v)?;
        }
        if let Some(v) = get("METEO_TIMEOUT_SECS") {
            config.timeout_secs = parse_number("METEO_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("METEO_SKIP_FETCH") {
            config.skip_fetch = parse_flag("METEO_SKIP_FETCH", &v)?;
        }

        Ok(config)
    }

    /// Set OAuth2 client credentials.
    pub fn with_credentials(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.client_id = id.into();
        self.client_secret = secret.into();
        self
    }

    /// Set the output root.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the altitude threshold.
    pub fn with_alt_threshold(mut self, metres: i64) -> Self {
        self.alt_threshold = metres;
        self
    }

    /// Set the partitions to fetch.
    pub fn with_partitions(mut self, scales: Vec<Scale>, regions: Vec<Region>) -> Self {
        self.scales = scales;
        self.regions = regions;
        self
    }

    /// Directory holding raw partition files.
    pub fn raw_dir(&self) -> PathBuf {
        self.output_dir.join("download").join("stations")
    }

    /// Path of the canonical dataset.
    pub fn canonical_path(&self) -> PathBuf {
        self.output_dir.join("stations.json")
    }
}

fn parse_number<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        }),
    }
}

/// Parse a comma-separated list, dropping duplicates but keeping order.
fn parse_list<T: PartialEq, E>(
    var: &'static str,
    value: &str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<Vec<T>, ConfigError>
where
    ConfigError: From<E>,
{
    let mut out = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = parse(item)?;
        if !out.contains(&parsed) {
            out.push(parsed);
        }
    }
    if out.is_empty() {
        return Err(ConfigError::EmptyList(var));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn default_config() {
        let config = PipelineConfig::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_requests_per_minute, 50);
        assert_eq!(config.alt_threshold, 1000);
        assert_eq!(config.scales, vec![Scale::Quotidienne]);
        let regions: Vec<&str> = config.regions.iter().map(Region::as_str).collect();
        assert_eq!(regions, vec!["38", "73", "74"]);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.token_margin, Duration::from_secs(60));
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[("ALT_SELECT", "  ")])).unwrap();
        assert_eq!(config.alt_threshold, 1000);
        assert_eq!(config.output_dir, PathBuf::from("data/metadonnees"));
    }

    #[test]
    fn reads_every_variable() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("METEO_BASE_URL", "http://localhost:8080"),
            ("METEO_TOKEN_URL", "http://localhost:8080/token"),
            ("METEO_CLIENT_ID", "id"),
            ("METEO_CLIENT_SECRET", "secret"),
            ("METEO_OUTPUT_DIR", "/tmp/out"),
            ("METEO_TOKEN_CACHE", "/tmp/token.json"),
            ("METEO_MAX_RPM", "20"),
            ("ALT_SELECT", "1500"),
            ("METEO_SCALES", "horaire, infrahoraire-6m,horaire"),
            ("METEO_DEPARTMENTS", "05,38"),
            ("METEO_MAX_CONCURRENT", "3"),
            ("METEO_TIMEOUT_SECS", "10"),
            ("METEO_SKIP_FETCH", "yes"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.token_url, "http://localhost:8080/token");
        assert_eq!(config.client_id, "id");
        assert_eq!(config.client_secret, "secret");
        assert_eq!(config.token_cache, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.max_requests_per_minute, 20);
        assert_eq!(config.alt_threshold, 1500);
        assert_eq!(config.scales, vec![Scale::Horaire, Scale::InfraHoraire6m]);
        assert_eq!(config.regions.len(), 2);
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.timeout_secs, 10);
        assert!(config.skip_fetch);
        assert_eq!(config.raw_dir(), PathBuf::from("/tmp/out/download/stations"));
        assert_eq!(config.canonical_path(), PathBuf::from("/tmp/out/stations.json"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = PipelineConfig::from_lookup(lookup(&[("METEO_MAX_RPM", "fifty")])).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for METEO_MAX_RPM: 'fifty'");

        let err = PipelineConfig::from_lookup(lookup(&[("METEO_SKIP_FETCH", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "METEO_SKIP_FETCH", .. }));

        let err = PipelineConfig::from_lookup(lookup(&[("METEO_SCALES", "mensuelle")])).unwrap_err();
        assert!(matches!(err, ConfigError::Scale(_)));

        let err = PipelineConfig::from_lookup(lookup(&[("METEO_DEPARTMENTS", ",,")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyList("METEO_DEPARTMENTS"));
    }

    #[test]
    fn builders() {
        let config = PipelineConfig::default()
            .with_credentials("id", "secret")
            .with_output_dir("/data")
            .with_alt_threshold(2000)
            .with_partitions(vec![Scale::Horaire], vec![Region::parse("05").unwrap()]);

        assert_eq!(config.client_id, "id");
        assert_eq!(config.output_dir, PathBuf::from("/data"));
        assert_eq!(config.alt_threshold, 2000);
        assert_eq!(config.scales, vec![Scale::Horaire]);
    }
}
