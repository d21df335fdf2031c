//! Merge per-partition station lists into the canonical dataset.
//!
//! Records are grouped by station id. Within a group the first non-null
//! coordinate and the first coercible altitude win, scanned in partition
//! order then item order. Scales are unioned. Stations that are closed,
//! lack coordinates or sit below the altitude threshold are dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::altitude::coerce_altitude;
use super::names::normalize_name;
use super::record::{Altitude, RawStationRecord};
use super::scale::{Partition, Scale};

/// One station of the canonical dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStationRecord {
    pub id: String,
    #[serde(rename = "nom")]
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    pub alt: i64,
    #[serde(rename = "_scales")]
    pub scales: BTreeSet<Scale>,
}

/// A field value that could not be coerced and was treated as missing.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionWarning {
    pub id: String,
    pub field: &'static str,
    pub raw: String,
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "station {}: could not coerce {} from {}",
            self.id, self.field, self.raw
        )
    }
}

/// Why a station was left out of the canonical dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Exclusion {
    Closed,
    MissingCoordinates,
    MissingAltitude,
    BelowThreshold,
}

/// Output of a fusion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FusionReport {
    /// Canonical stations sorted by id
    pub stations: Vec<CanonicalStationRecord>,
    /// Non-fatal coercion problems, in scan order
    pub warnings: Vec<CoercionWarning>,
    /// Number of distinct ids dropped, per reason
    pub excluded: BTreeMap<Exclusion, usize>,
}

/// Everything known about one id so far.
#[derive(Debug, Default)]
struct Accumulator {
    name: Option<String>,
    lon: Option<f64>,
    lat: Option<f64>,
    alt: Option<i64>,
    closed: bool,
    scales: BTreeSet<Scale>,
}

impl Accumulator {
    fn absorb(&mut self, record: &RawStationRecord, warnings: &mut Vec<CoercionWarning>) {
        if self.name.is_none() && !record.name.trim().is_empty() {
            self.name = Some(record.name.clone());
        }
        if self.lon.is_none() {
            self.lon = record.lon;
        }
        if self.lat.is_none() {
            self.lat = record.lat;
        }
        if self.alt.is_none()
            && let Some(raw) = &record.alt
        {
            self.alt = coerce_altitude(raw);
            if self.alt.is_none() {
                warnings.push(CoercionWarning {
                    id: record.id.clone(),
                    field: "alt",
                    raw: describe(raw),
                });
            }
        }
        if record.open == Some(false) {
            self.closed = true;
        }
        self.scales.insert(record.scale);
    }

    fn finish(self, id: String, alt_threshold: i64) -> Result<CanonicalStationRecord, Exclusion> {
        if self.closed {
            return Err(Exclusion::Closed);
        }
        let (Some(lon), Some(lat)) = (self.lon, self.lat) else {
            return Err(Exclusion::MissingCoordinates);
        };
        let alt = self.alt.ok_or(Exclusion::MissingAltitude)?;
        if alt < alt_threshold {
            return Err(Exclusion::BelowThreshold);
        }

        Ok(CanonicalStationRecord {
            name: normalize_name(self.name.as_deref().unwrap_or_default()),
            id,
            lon,
            lat,
            alt,
            scales: self.scales,
        })
    }
}

fn describe(raw: &Altitude) -> String {
    match raw {
        Altitude::Text(s) => format!("{s:?}"),
        Altitude::Int(v) => v.to_string(),
        Altitude::Float(v) => v.to_string(),
        Altitude::Other(v) => v.to_string(),
    }
}

/// Fuse raw partitions into the canonical dataset.
///
/// Keeps stations with `alt >= alt_threshold` that are not explicitly
/// closed. No partitions gives an empty report, not an error. The same
/// input always produces the same output, in the same order.
pub fn fuse(
    partitions: &BTreeMap<Partition, Vec<RawStationRecord>>,
    alt_threshold: i64,
) -> FusionReport {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let mut warnings = Vec::new();

    for record in partitions.values().flatten() {
        groups
            .entry(record.id.as_str())
            .or_default()
            .absorb(record, &mut warnings);
    }

    for warning in &warnings {
        warn!(id = %warning.id, field = warning.field, raw = %warning.raw, "coercion failed, treating as missing");
    }

    let mut report = FusionReport {
        warnings,
        ..FusionReport::default()
    };

    for (id, acc) in groups {
        match acc.finish(id.to_string(), alt_threshold) {
            Ok(station) => report.stations.push(station),
            Err(reason) => *report.excluded.entry(reason).or_default() += 1,
        }
    }

    debug!(
        kept = report.stations.len(),
        excluded = ?report.excluded,
        "fusion finished"
    );

    report
}
