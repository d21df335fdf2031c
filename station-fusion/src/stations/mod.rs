//! Station metadata: fetching, storage and fusion.
//!
//! Station lists are fetched per (scale, region) partition, annotated with
//! their scale and written to disk one file per partition. Fusion then
//! merges every partition into one deduplicated, normalized dataset.

mod altitude;
mod error;
mod fetcher;
mod fusion;
mod names;
mod output;
mod record;
mod scale;
mod store;

pub use altitude::coerce_altitude;
pub use error::{FetchError, StoreError};
pub use fetcher::{FetchReport, StationFetcher};
pub use fusion::{CanonicalStationRecord, CoercionWarning, Exclusion, FusionReport, fuse};
pub use names::normalize_name;
pub use output::{HEADER, format_record, write_records};
pub use record::{Altitude, RawStationRecord, annotate, parse_items};
pub use scale::{InvalidRegion, InvalidScale, Partition, Region, Scale};
pub use store::{PartitionStore, load_canonical, save_canonical};
