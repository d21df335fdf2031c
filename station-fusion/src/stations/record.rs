//! Raw station items as returned by the station-list endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::scale::Scale;

/// Key added to every item with the scale it was fetched under.
pub const SCALE_KEY: &str = "_scale";

/// Key holding every scale an item has been annotated with.
pub const SCALES_KEY: &str = "_scales";

/// Altitude exactly as the upstream sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Altitude {
    Int(i64),
    Float(f64),
    Text(String),
    /// Anything else (booleans, objects, ...); never coercible
    Other(Value),
}

/// Upstream fields of one station item.
#[derive(Debug, Deserialize)]
struct StationItem {
    #[serde(default, deserialize_with = "lenient_id")]
    id: String,
    #[serde(default, rename = "nom", deserialize_with = "lenient_string")]
    name: String,
    #[serde(default, deserialize_with = "lenient_float")]
    lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient_float")]
    lat: Option<f64>,
    #[serde(default)]
    alt: Option<Altitude>,
    #[serde(default, rename = "posteOuvert", deserialize_with = "lenient_bool")]
    open: Option<bool>,
}

/// One station as seen in one (scale, region) partition.
///
/// May be incomplete in geodata; immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStationRecord {
    pub id: String,
    pub name: String,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub alt: Option<Altitude>,
    pub open: Option<bool>,
    pub scale: Scale,
}

impl RawStationRecord {
    /// Build a record from an upstream item fetched under `scale`.
    ///
    /// Returns `Ok(None)` for items without an id.
    pub fn from_item(item: &Value, scale: Scale) -> Result<Option<Self>, serde_json::Error> {
        let item = StationItem::deserialize(item)?;
        if item.id.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            id: item.id,
            name: item.name,
            lon: item.lon,
            lat: item.lat,
            alt: item.alt,
            open: item.open,
            scale,
        }))
    }
}

/// Parse every item of a partition, skipping unusable ones.
pub fn parse_items(items: &[Value], scale: Scale) -> Vec<RawStationRecord> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match RawStationRecord::from_item(item, scale) {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                debug!(%scale, index, "skipping item without id");
                None
            }
            Err(e) => {
                warn!(%scale, index, error = %e, "skipping malformed station item");
                None
            }
        })
        .collect()
}

/// Tag every object in `items` with the scale it was fetched under.
///
/// Sets `_scale` and appends to `_scales` unless already present.
pub fn annotate(items: &mut [Value], scale: Scale) {
    for item in items.iter_mut() {
        let Value::Object(map) = item else {
            continue;
        };
        map.insert(SCALE_KEY.to_string(), Value::from(scale.as_str()));

        let scales = map
            .entry(SCALES_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        if !scales.is_array() {
            *scales = Value::Array(Vec::new());
        }
        if let Value::Array(list) = scales
            && !list.iter().any(|s| s.as_str() == Some(scale.as_str()))
        {
            list.push(Value::from(scale.as_str()));
        }
    }
}

/// Short name of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Ids arrive as strings or numbers; both are trimmed to a string.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// Numbers or numeric strings; anything else is treated as missing.
fn lenient_float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    };
    Ok(value.filter(|v: &f64| v.is_finite()))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "oui" => Some(true),
            "false" | "0" | "non" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    })
}
