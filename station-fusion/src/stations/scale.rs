//! Partition keys: measurement granularity and administrative region.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown granularity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scale '{0}' (expected infrahoraire-6m, horaire or quotidienne)")]
pub struct InvalidScale(pub String);

/// Sampling frequency tier of a station's measurements.
///
/// Variants are declared in lexicographic order of their wire names, so the
/// derived `Ord` sorts the same way the names do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scale {
    #[serde(rename = "horaire")]
    Horaire,
    #[serde(rename = "infrahoraire-6m")]
    InfraHoraire6m,
    #[serde(rename = "quotidienne")]
    Quotidienne,
}

impl Scale {
    /// Every known scale, in canonical order.
    pub const ALL: [Scale; 3] = [Scale::Horaire, Scale::InfraHoraire6m, Scale::Quotidienne];

    /// Parse a scale from its wire name.
    pub fn parse(s: &str) -> Result<Self, InvalidScale> {
        match s.trim() {
            "horaire" => Ok(Scale::Horaire),
            "infrahoraire-6m" => Ok(Scale::InfraHoraire6m),
            "quotidienne" => Ok(Scale::Quotidienne),
            other => Err(InvalidScale(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Horaire => "horaire",
            Scale::InfraHoraire6m => "infrahoraire-6m",
            Scale::Quotidienne => "quotidienne",
        }
    }

    /// Station-list endpoint for this scale, relative to the API base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Scale::Horaire => "/liste-stations/horaire",
            Scale::InfraHoraire6m => "/liste-stations/infrahoraire-6m",
            Scale::Quotidienne => "/liste-stations/quotidienne",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an invalid region code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid region '{0}': must be a non-empty alphanumeric code")]
pub struct InvalidRegion(pub String);

/// Administrative region (a French département code such as `38` or `2A`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(String);

impl Region {
    pub fn parse(s: &str) -> Result<Self, InvalidRegion> {
        let code = s.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(InvalidRegion(s.to_string()));
        }
        Ok(Region(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One (scale, region) query: the unit of fetching and raw storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition {
    pub scale: Scale,
    pub region: Region,
}

impl Partition {
    pub fn new(scale: Scale, region: Region) -> Self {
        Self { scale, region }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scale, self.region)
    }
}
