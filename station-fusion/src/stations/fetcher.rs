//! Fetch station lists for every (scale, region) partition.

use std::collections::{BTreeMap, BTreeSet};

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiResponse, Transport};
use crate::auth::TokenSource;

use super::error::FetchError;
use super::record::{RawStationRecord, annotate, json_kind, parse_items};
use super::scale::{Partition, Region, Scale};
use super::store::PartitionStore;

/// Query parameter carrying the region.
const REGION_PARAM: &str = "id-departement";

/// Settled result of fetching every requested partition.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Partitions that were fetched and persisted
    pub partitions: BTreeMap<Partition, Vec<RawStationRecord>>,
    /// Partitions that failed terminally, in fetch order
    pub failures: Vec<(Partition, FetchError)>,
}

impl FetchReport {
    /// Items retrieved per partition; failed partitions count zero.
    pub fn counts(&self) -> BTreeMap<&Partition, usize> {
        let mut counts: BTreeMap<&Partition, usize> =
            self.partitions.iter().map(|(p, r)| (p, r.len())).collect();
        for (partition, _) in &self.failures {
            counts.insert(partition, 0);
        }
        counts
    }

    /// Total items retrieved per scale.
    pub fn totals_by_scale(&self) -> BTreeMap<Scale, usize> {
        let mut totals = BTreeMap::new();
        for (partition, count) in self.counts() {
            *totals.entry(partition.scale).or_default() += count;
        }
        totals
    }

    pub fn succeeded(&self) -> usize {
        self.partitions.len()
    }
}

/// Drives the API client across partitions and persists each one.
pub struct StationFetcher<T, S> {
    client: ApiClient<T, S>,
    store: PartitionStore,
    max_concurrent: usize,
}

impl<T: Transport, S: TokenSource> StationFetcher<T, S> {
    /// Create a fetcher that fetches one partition at a time.
    pub fn new(client: ApiClient<T, S>, store: PartitionStore) -> Self {
        Self {
            client,
            store,
            max_concurrent: 1,
        }
    }

    /// Allow up to `n` partitions in flight; the rate limiter still gates requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    pub fn store(&self) -> &PartitionStore {
        &self.store
    }

    /// Fetch, annotate and persist a single partition.
    pub async fn fetch_partition(
        &self,
        partition: &Partition,
    ) -> Result<Vec<RawStationRecord>, FetchError> {
        let params = [(REGION_PARAM, partition.region.as_str().to_string())];
        let response = self
            .client
            .request(partition.scale.endpoint(), &params)
            .await?;

        let mut items = match response {
            ApiResponse::Json(Value::Array(items)) => items,
            ApiResponse::Json(other) => return Err(FetchError::UnexpectedShape(json_kind(&other))),
            ApiResponse::NoContent => {
                warn!(%partition, "204 No Content");
                return Err(FetchError::NoContent);
            }
        };

        annotate(&mut items, partition.scale);
        self.store.save(partition, &items)?;
        Ok(parse_items(&items, partition.scale))
    }

    /// Fetch the cross product of `scales` and `regions`.
    ///
    /// Partitions are visited in sorted (scale, region) order. A failing
    /// partition is logged and skipped; the others still complete.
    pub async fn fetch_all(&self, scales: &[Scale], regions: &[Region]) -> FetchReport {
        let partitions: BTreeSet<Partition> = scales
            .iter()
            .flat_map(|&scale| {
                regions
                    .iter()
                    .map(move |region| Partition::new(scale, region.clone()))
            })
            .collect();

        let results: Vec<(Partition, Result<Vec<RawStationRecord>, FetchError>)> =
            stream::iter(partitions)
                .map(|partition| async move {
                    let result = self.fetch_partition(&partition).await;
                    (partition, result)
                })
                .buffered(self.max_concurrent)
                .collect()
                .await;

        let mut report = FetchReport::default();
        for (partition, result) in results {
            match result {
                Ok(records) => {
                    info!(
                        scale = %partition.scale,
                        region = %partition.region,
                        items = records.len(),
                        "partition fetched"
                    );
                    report.partitions.insert(partition, records);
                }
                Err(e) => {
                    warn!(
                        scale = %partition.scale,
                        region = %partition.region,
                        error = %e,
                        "partition failed"
                    );
                    report.failures.push((partition, e));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::api::mock::MockTransport;
    use crate::api::{ApiError, RateLimiter, TransportResponse};
    use crate::auth::TokenStore;
    use crate::auth::mock::CountingTokenSource;
    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    fn regions(codes: &[&str]) -> Vec<Region> {
        codes.iter().map(|c| Region::parse(c).unwrap()).collect()
    }

    fn fetcher(transport: MockTransport) -> (StationFetcher<MockTransport, CountingTokenSource>, TempDir) {
        let dir = tempdir().unwrap();
        let client = ApiClient::new(
            transport,
            Arc::new(TokenStore::new(CountingTokenSource::new())),
            Arc::new(RateLimiter::per_minute(50)),
        )
        .with_base_url("http://api.test");
        let fetcher = StationFetcher::new(client, PartitionStore::new(dir.path()));
        (fetcher, dir)
    }

    /// One station per partition, id derived from scale and region.
    fn echo_transport() -> MockTransport {
        MockTransport::new(|req| {
            let region = req.param("id-departement").unwrap_or_default();
            let scale = req.url.rsplit('/').next().unwrap_or_default();
            let body = json!([{"id": format!("{scale}-{region}"), "nom": "X", "alt": 1500}]);
            Ok(TransportResponse::new(200, body.to_string()))
        })
    }

    #[tokio::test]
    async fn fetches_cross_product_in_order() {
        let (fetcher, _dir) = fetcher(echo_transport());

        let report = fetcher
            .fetch_all(&[Scale::Quotidienne, Scale::Horaire], &regions(&["74", "38"]))
            .await;

        assert_eq!(report.succeeded(), 4);
        assert!(report.failures.is_empty());

        let seen: Vec<String> = fetcher
            .client
            .transport()
            .requests()
            .into_iter()
            .map(|r| format!("{}?{}", r.url, r.param("id-departement").unwrap()))
            .collect();
        assert_eq!(
            seen,
            vec![
                "http://api.test/liste-stations/horaire?38",
                "http://api.test/liste-stations/horaire?74",
                "http://api.test/liste-stations/quotidienne?38",
                "http://api.test/liste-stations/quotidienne?74",
            ]
        );
    }

    #[tokio::test]
    async fn persists_annotated_partition() {
        let (fetcher, dir) = fetcher(echo_transport());
        let partition = Partition::new(Scale::Horaire, Region::parse("38").unwrap());

        let records = fetcher.fetch_partition(&partition).await.unwrap();
        assert_eq!(records[0].id, "horaire-38");

        let path = dir.path().join("horaire").join("stations_38.json");
        let saved: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved[0]["_scale"], "horaire");
        assert_eq!(saved[0]["_scales"], json!(["horaire"]));
    }

    #[tokio::test]
    async fn failing_partitions_are_skipped() {
        let transport = MockTransport::new(|req| {
            Ok(match req.param("id-departement") {
                Some("73") => TransportResponse::new(500, "boom"),
                Some("74") => TransportResponse::new(204, ""),
                _ => TransportResponse::new(200, r#"[{"id":"1"}]"#),
            })
        });
        let (fetcher, dir) = fetcher(transport);

        let report = fetcher
            .fetch_all(&[Scale::Horaire], &regions(&["38", "73", "74"]))
            .await;

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            report.failures[0].1,
            FetchError::Api(ApiError::Transport { status: Some(500), .. })
        ));
        assert!(matches!(report.failures[1].1, FetchError::NoContent));
        assert!(!dir.path().join("horaire").join("stations_73.json").exists());
    }

    #[tokio::test]
    async fn non_array_body_is_unexpected_shape() {
        let transport = MockTransport::new(|_| Ok(TransportResponse::new(200, r#"{"code":"x"}"#)));
        let (fetcher, _dir) = fetcher(transport);
        let partition = Partition::new(Scale::Horaire, Region::parse("38").unwrap());

        let err = fetcher.fetch_partition(&partition).await.unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedShape("object")));
    }

    #[tokio::test]
    async fn counts_and_totals() {
        let transport = MockTransport::new(|req| {
            Ok(match req.param("id-departement") {
                Some("73") => TransportResponse::new(404, ""),
                _ => TransportResponse::new(200, r#"[{"id":"1"},{"id":"2"}]"#),
            })
        });
        let (fetcher, _dir) = fetcher(transport);

        let report = fetcher
            .fetch_all(&[Scale::Horaire, Scale::Quotidienne], &regions(&["38", "73"]))
            .await;

        let counts: Vec<usize> = report.counts().values().copied().collect();
        assert_eq!(counts, vec![2, 0, 2, 0]);
        assert_eq!(
            report.totals_by_scale(),
            BTreeMap::from([(Scale::Horaire, 2), (Scale::Quotidienne, 2)])
        );
    }

    #[tokio::test]
    async fn concurrent_fetch_keeps_order_and_single_token() {
        let source = CountingTokenSource::new().with_delay(std::time::Duration::from_millis(10));
        let dir = tempdir().unwrap();
        let client = ApiClient::new(
            echo_transport(),
            Arc::new(TokenStore::new(source.clone())),
            Arc::new(RateLimiter::per_minute(50)),
        );
        let fetcher = StationFetcher::new(client, PartitionStore::new(dir.path())).with_max_concurrent(4);

        let report = fetcher
            .fetch_all(&Scale::ALL, &regions(&["38", "73", "74"]))
            .await;

        assert_eq!(report.succeeded(), 9);
        assert_eq!(source.acquisitions(), 1);
    }
}
