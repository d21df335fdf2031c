//! Disk storage for raw partitions and the canonical dataset.
//!
//! Raw partitions live at `<root>/<scale>/stations_<region>.json`, one file
//! per partition, so a failure part-way through a run keeps everything
//! already downloaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::error::StoreError;
use super::fusion::CanonicalStationRecord;
use super::record::{RawStationRecord, parse_items};
use super::scale::{Partition, Region, Scale};

const FILE_PREFIX: &str = "stations_";
const FILE_EXTENSION: &str = "json";

/// Raw partition files under a root directory.
#[derive(Debug, Clone)]
pub struct PartitionStore {
    root: PathBuf,
}

impl PartitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding one partition.
    pub fn partition_path(&self, partition: &Partition) -> PathBuf {
        self.root.join(partition.scale.as_str()).join(format!(
            "{FILE_PREFIX}{}.{FILE_EXTENSION}",
            partition.region
        ))
    }

    /// Write the annotated items of one partition, replacing any previous copy.
    pub fn save(&self, partition: &Partition, items: &[Value]) -> Result<PathBuf, StoreError> {
        let path = self.partition_path(partition);
        write_json(&path, items)?;
        Ok(path)
    }

    /// Read one partition back.
    pub fn load(&self, partition: &Partition) -> Result<Vec<RawStationRecord>, StoreError> {
        let path = self.partition_path(partition);
        let contents =
            std::fs::read_to_string(&path).map_err(|e| StoreError::io("failed to read", &path, e))?;
        let items: Vec<Value> =
            serde_json::from_str(&contents).map_err(|e| StoreError::json(&path, e))?;
        Ok(parse_items(&items, partition.scale))
    }

    /// Read every persisted partition.
    ///
    /// A missing root yields an empty map. Unreadable or malformed files are
    /// skipped with a warning.
    pub fn load_all(&self) -> Result<BTreeMap<Partition, Vec<RawStationRecord>>, StoreError> {
        let mut partitions = BTreeMap::new();

        for scale in Scale::ALL {
            let dir = self.root.join(scale.as_str());
            if !dir.is_dir() {
                continue;
            }

            let entries =
                std::fs::read_dir(&dir).map_err(|e| StoreError::io("failed to list", &dir, e))?;

            for entry in entries {
                let entry = entry.map_err(|e| StoreError::io("failed to list", &dir, e))?;
                let Some(region) = region_from_path(&entry.path()) else {
                    continue;
                };

                let partition = Partition::new(scale, region);
                match self.load(&partition) {
                    Ok(records) => {
                        partitions.insert(partition, records);
                    }
                    Err(e) => warn!(%partition, error = %e, "skipping unreadable partition file"),
                }
            }
        }

        Ok(partitions)
    }
}

/// Region encoded in a `stations_<region>.json` file name.
fn region_from_path(path: &Path) -> Option<Region> {
    if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some(FILE_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    Region::parse(stem.strip_prefix(FILE_PREFIX)?).ok()
}

/// Write the canonical dataset, replacing the previous run's file.
pub fn save_canonical(path: &Path, stations: &[CanonicalStationRecord]) -> Result<(), StoreError> {
    write_json(path, stations)
}

/// Read a canonical dataset written by [`save_canonical`].
pub fn load_canonical(path: &Path) -> Result<Vec<CanonicalStationRecord>, StoreError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| StoreError::io("failed to read", path, e))?;
    serde_json::from_str(&contents).map_err(|e| StoreError::json(path, e))
}

/// Pretty-print `value` to `path`, creating parent directories.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::io("failed to create directory", parent, e))?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::json(path, e))?;
    std::fs::write(path, json).map_err(|e| StoreError::io("failed to write", path, e))
}
