//! APM (Apple Partition Map) implementation

pub mod types;

use crate::registry;
use platter_core::{
    bytes, Error, PartitionTableEntry, PartitionTypeCode, Result, ZoneTable, MAX_PARTITION_COUNT,
    SECTOR_SIZE,
};
use types::{ApmEntry, DriverDescriptor};

/// Apple partition map
///
/// Block 0 optionally holds a driver descriptor. The map itself starts at
/// block 1 with one 512-byte entry per partition; every entry repeats the
/// total entry count, and the first entry describes the map itself.
#[derive(Debug, Clone)]
pub struct ApmZoneTable {
    driver_descriptor: Option<DriverDescriptor>,
    entries: Vec<PartitionTableEntry>,
    raw_entries: Vec<ApmEntry>,
}

impl ApmZoneTable {
    /// Byte offset of the first map entry
    pub const MAP_OFFSET: usize = SECTOR_SIZE;

    /// Type string that the first map entry must carry
    pub const MAP_TYPE: &'static str = "Apple_partition_map";

    /// Do block 1 carry "PM" and describe the partition map?
    pub fn has_signature(buf: &[u8]) -> bool {
        if buf.len() < Self::MAP_OFFSET + ApmEntry::ENTRY_SIZE {
            return false;
        }
        &buf[Self::MAP_OFFSET..Self::MAP_OFFSET + 2] == ApmEntry::SIGNATURE
            && bytes::read_ascii_z(buf, Self::MAP_OFFSET + 0x30, ApmEntry::TYPE_LEN)
                .map_or(false, |t| t == Self::MAP_TYPE)
    }

    /// Parse the partition map from the start of a device
    ///
    /// The entry count comes from the first entry. Entries that do not fit in
    /// `buf` are dropped, and the walk stops at the first block without "PM".
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if !Self::has_signature(buf) {
            return Err(Error::format("No Apple partition map at block 1"));
        }

        let driver_descriptor = DriverDescriptor::parse(buf)?;
        if let Some(ddr) = &driver_descriptor {
            if ddr.block_size as usize != SECTOR_SIZE {
                tracing::debug!(block_size = ddr.block_size, "APM driver descriptor block size");
            }
        }

        let count = bytes::read_be_u32(buf, Self::MAP_OFFSET + 0x04)? as usize;
        if count > MAX_PARTITION_COUNT {
            tracing::warn!(count, limit = MAX_PARTITION_COUNT, "APM entry count capped");
        }

        let mut entries = Vec::new();
        let mut raw_entries = Vec::new();

        for i in 0..count.min(MAX_PARTITION_COUNT) {
            let offset = Self::MAP_OFFSET + i * ApmEntry::ENTRY_SIZE;
            let raw = match ApmEntry::parse(buf, offset) {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    tracing::warn!(index = i, "APM entry without signature ends the map");
                    break;
                }
                Err(_) => {
                    tracing::debug!(index = i, "APM entry outside probe window");
                    break;
                }
            };

            let type_name = registry::apm::lookup(&raw.type_string);
            entries.push(
                PartitionTableEntry::new(
                    i,
                    raw.start_block as u64,
                    raw.block_count as u64,
                    PartitionTypeCode::Ascii(raw.type_string.clone()),
                    type_name,
                )
                .with_bootable(raw.is_bootable())
                .with_raw_name(raw.name.clone()),
            );
            raw_entries.push(raw);
        }

        tracing::debug!(entries = entries.len(), "parsed APM");

        Ok(Self {
            driver_descriptor,
            entries,
            raw_entries,
        })
    }

    /// Drop entries that do not fit on a device of `device_sectors` sectors
    pub fn restrict_to(mut self, device_sectors: u64) -> Self {
        let mut kept = self
            .entries
            .iter()
            .map(|e| e.fits_within(device_sectors))
            .collect::<Vec<_>>()
            .into_iter();
        crate::retain_on_device(&mut self.entries, device_sectors, "APM");
        self.raw_entries.retain(|_| kept.next().unwrap_or(false));
        self
    }

    pub fn driver_descriptor(&self) -> Option<&DriverDescriptor> {
        self.driver_descriptor.as_ref()
    }

    /// Decoded map entries, in the same order as [`ZoneTable::entries`]
    pub fn raw_entries(&self) -> &[ApmEntry] {
        &self.raw_entries
    }
}

impl ZoneTable for ApmZoneTable {
    fn identify(&self) -> &str {
        "Apple Partition Map"
    }

    fn entries(&self) -> &[PartitionTableEntry] {
        &self.entries
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn put_entry(disk: &mut [u8], slot: usize, count: u32, start: u32, len: u32, name: &str, kind: &str) {
        let off = 512 + slot * 512;
        disk[off..off + 2].copy_from_slice(b"PM");
        disk[off + 0x04..off + 0x08].copy_from_slice(&count.to_be_bytes());
        disk[off + 0x08..off + 0x0C].copy_from_slice(&start.to_be_bytes());
        disk[off + 0x0C..off + 0x10].copy_from_slice(&len.to_be_bytes());
        disk[off + 0x10..off + 0x10 + name.len()].copy_from_slice(name.as_bytes());
        disk[off + 0x30..off + 0x30 + kind.len()].copy_from_slice(kind.as_bytes());
    }

    /// A disk image with a three-entry partition map
    pub(crate) fn create_test_apm() -> Vec<u8> {
        let mut disk = vec![0u8; 16 * 1024];
        disk[0..2].copy_from_slice(b"ER");
        disk[2..4].copy_from_slice(&512u16.to_be_bytes());
        disk[4..8].copy_from_slice(&8192u32.to_be_bytes());

        put_entry(&mut disk, 0, 3, 1, 63, "Apple", "Apple_partition_map");
        put_entry(&mut disk, 1, 3, 64, 4000, "Macintosh HD", "Apple_HFS");
        put_entry(&mut disk, 2, 3, 4064, 4128, "Extra", "Apple_Mystery");
        disk
    }

    #[test]
    fn test_parse_apm() {
        let table = ApmZoneTable::parse(&create_test_apm()).unwrap();

        assert_eq!(table.identify(), "Apple Partition Map");
        assert_eq!(table.driver_descriptor().map(|d| d.block_count), Some(8192));

        let entries = table.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].type_name, "APPLE_PARTITION_MAP");
        assert_eq!(entries[1].type_name, "APPLE_HFS");
        assert_eq!(entries[1].raw_name, "Macintosh HD");
        assert_eq!(entries[1].start_sector, 64);
        assert_eq!(entries[1].sector_count, 4000);
        assert_eq!(
            entries[1].type_code,
            PartitionTypeCode::Ascii("Apple_HFS".into())
        );
        assert_eq!(entries[2].type_name, "UNKNOWN");
    }

    #[test]
    fn test_signature_requires_map_type() {
        let mut disk = create_test_apm();
        assert!(ApmZoneTable::has_signature(&disk));

        disk[512 + 0x30..512 + 0x50].copy_from_slice(&[0u8; 32]);
        disk[512 + 0x30..512 + 0x39].copy_from_slice(b"Apple_HFS");
        assert!(!ApmZoneTable::has_signature(&disk));
        assert!(ApmZoneTable::parse(&disk).is_err());
    }

    #[test]
    fn test_signature_ignores_byte_after_type_field() {
        let mut disk = create_test_apm();
        disk[512 + 0x4F] = 0xFF;
        assert!(ApmZoneTable::has_signature(&disk));
    }

    #[test]
    fn test_entries_beyond_buffer_are_dropped() {
        let disk = create_test_apm();
        let table = ApmZoneTable::parse(&disk[..512 * 3]).unwrap();
        assert_eq!(table.entries().len(), 2);
    }

    #[test]
    fn test_missing_signature_ends_map() {
        let mut disk = create_test_apm();
        disk[512 * 2] = 0;

        let table = ApmZoneTable::parse(&disk).unwrap();
        assert_eq!(table.entries().len(), 1);
    }

    #[test]
    fn test_restrict_to_device() {
        let table = ApmZoneTable::parse(&create_test_apm()).unwrap().restrict_to(5000);
        assert_eq!(table.entries().len(), 2);
        assert_eq!(table.raw_entries().len(), 2);
    }
}
