//! Flat record stream handed to the downstream uploader.
//!
//! One CSV line per canonical station: `id,nom,lon,lat,alt,_scales`, with
//! scales as a compact JSON array. The uploader upserts on `id`.

use std::io::{self, Write};

use super::fusion::CanonicalStationRecord;

/// Header line of the record stream.
pub const HEADER: &str = "id,nom,lon,lat,alt,_scales";

/// Write the header and one line per station.
///
/// An empty slice still writes the header, which downstream reads as an
/// explicit empty result.
pub fn write_records<W: Write>(mut out: W, stations: &[CanonicalStationRecord]) -> io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for station in stations {
        writeln!(out, "{}", format_record(station))?;
    }
    out.flush()
}

/// Format one station as a CSV line (without the newline).
pub fn format_record(station: &CanonicalStationRecord) -> String {
    let scales: Vec<&str> = station.scales.iter().map(|s| s.as_str()).collect();
    // Names never contain commas in the stream; the scales list may.
    let name = station.name.replace([',', '\n', '\r'], " ");
    format!(
        "{},{},{},{},{},{}",
        station.id,
        name,
        station.lon,
        station.lat,
        station.alt,
        serde_json::Value::from(scales)
    )
}
