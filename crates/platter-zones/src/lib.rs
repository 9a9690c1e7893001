//! # Platter Zones
//!
//! Partition table handlers.
//!
//! This crate provides implementations of various partition table formats:
//! - **MBR**: Master Boot Record with extended (EBR) chains
//! - **GPT**: GUID Partition Table with CRC32 checks
//! - **APM**: Apple Partition Map
//!
//! Type codes resolve through the [`registry`] tables; unknown codes map to
//! `UNKNOWN`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use platter_pipeline::MmapPipeline;
//! use platter_zones::read_zone_table;
//! use std::path::Path;
//!
//! let mut image = MmapPipeline::open(Path::new("disk.img")).unwrap();
//! if let Some(table) = read_zone_table(&mut image).unwrap() {
//!     println!("Partition table: {}", table.identify());
//!     for zone in table.iter() {
//!         println!("  {}", zone);
//!     }
//! }
//! ```

pub mod apm;
pub mod factory;
pub mod gpt;
pub mod guid;
pub mod mbr;
pub mod registry;

pub use apm::ApmZoneTable;
pub use factory::{detect_type, detect_zone_table, read_zone_table, ZoneTableType};
pub use gpt::GptZoneTable;
pub use guid::Guid;
pub use mbr::MbrZoneTable;
pub use registry::{PartitionType, UNKNOWN};

use platter_core::PartitionTableEntry;

/// Remove entries whose extent runs past the device, with a warning each
pub(crate) fn retain_on_device(
    entries: &mut Vec<PartitionTableEntry>,
    device_sectors: u64,
    scheme: &str,
) {
    entries.retain(|entry| {
        let fits = entry.fits_within(device_sectors);
        if !fits {
            tracing::warn!(
                scheme,
                index = entry.index,
                start = entry.start_sector,
                count = entry.sector_count,
                device_sectors,
                "dropping partition that extends past the device"
            );
        }
        fits
    });
}
