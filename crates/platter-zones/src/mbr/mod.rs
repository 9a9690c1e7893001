//! MBR (Master Boot Record) partition table implementation

pub mod types;

use crate::registry::ibm;
use platter_core::{
    bytes, BlockDevice, Error, PartitionTableEntry, PartitionTypeCode, Result, ZoneTable,
    MAX_EBR_CHAIN, SECTOR_SIZE,
};
use std::collections::HashSet;
use types::MbrRecord;

/// OEM names of boot sectors that carry a filesystem rather than a table
const FILESYSTEM_OEM_NAMES: &[&[u8; 8]] = &[
    b"MSDOS5.0",
    b"MSWIN4.1",
    b"IBM  3.3",
    b"IBM  7.1",
    b"mkdosfs\0",
    b"FreeDOS ",
    b"NTFS    ",
];

/// MBR partition table
///
/// The Master Boot Record is the traditional partitioning scheme used by BIOS-based systems.
/// It supports up to 4 primary partitions, one of which may be an extended container
/// holding a chain of EBRs with one logical partition each.
///
/// # Structure
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x000   440   Bootstrap code
/// 0x1B8   4     Disk signature
/// 0x1BE   16    Partition entry 1
/// 0x1CE   16    Partition entry 2
/// 0x1DE   16    Partition entry 3
/// 0x1EE   16    Partition entry 4
/// 0x1FE   2     Boot signature (0x55 0xAA)
/// ```
#[derive(Debug, Clone)]
pub struct MbrZoneTable {
    records: [MbrRecord; 4],
    entries: Vec<PartitionTableEntry>,
    logical: Vec<PartitionTableEntry>,
    disk_signature: u32,
}

impl MbrZoneTable {
    /// Size of the MBR in bytes (always 512)
    pub const MBR_SIZE: usize = 512;

    /// Offset of the first partition entry
    pub const PARTITION_TABLE_OFFSET: usize = 0x1BE;

    /// Offset of the disk signature
    pub const DISK_SIGNATURE_OFFSET: usize = 0x1B8;

    /// Offset of the boot signature
    pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;

    /// Number of partition entries in MBR
    pub const NUM_PARTITIONS: usize = 4;

    /// Slot number given to the first logical partition
    pub const FIRST_LOGICAL_INDEX: usize = 4;

    /// Are `0x55 0xAA` present at the end of the first sector?
    pub fn has_signature(buf: &[u8]) -> bool {
        buf.len() >= Self::MBR_SIZE
            && buf[Self::BOOT_SIGNATURE_OFFSET] == 0x55
            && buf[Self::BOOT_SIGNATURE_OFFSET + 1] == 0xAA
    }

    /// Does the first sector look like a partition table?
    ///
    /// The signature is required. Sectors that are really a Linux kernel
    /// image or a FAT/NTFS boot sector carry the same signature and are
    /// ruled out.
    pub fn contains_partition_table(buf: &[u8]) -> bool {
        if !Self::has_signature(buf) {
            return false;
        }

        if buf.len() > 520 && &buf[514..518] == b"HdrS" {
            tracing::debug!("boot sector is a Linux kernel header");
            return false;
        }

        let oem = &buf[3..11];
        if FILESYSTEM_OEM_NAMES.iter().any(|name| &name[..] == oem) {
            tracing::debug!(
                oem = %String::from_utf8_lossy(oem),
                "boot sector belongs to a filesystem"
            );
            return false;
        }

        true
    }

    /// Parse the primary table from the first sector of `buf`
    ///
    /// Empty slots and slots with an illegal boot indicator are skipped.
    /// Logical partitions need device access; see [`read_extended`](Self::read_extended).
    ///
    /// # Errors
    ///
    /// Returns a format error if the boot signature is missing.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if !Self::has_signature(buf) {
            return Err(Error::format("Invalid MBR boot signature"));
        }

        let disk_signature = bytes::read_le_u32(buf, Self::DISK_SIGNATURE_OFFSET)?;

        let mut records = [MbrRecord::parse(buf, Self::PARTITION_TABLE_OFFSET)?; 4];
        for (i, record) in records.iter_mut().enumerate().skip(1) {
            *record = MbrRecord::parse(buf, Self::PARTITION_TABLE_OFFSET + i * MbrRecord::SIZE)?;
        }

        let mut entries = Vec::new();
        for (i, record) in records.iter().enumerate() {
            if record.is_empty() {
                continue;
            }
            if !record.is_valid() {
                tracing::debug!(
                    slot = i,
                    boot_indicator = record.boot_indicator,
                    "skipping MBR slot with illegal boot indicator"
                );
                continue;
            }
            entries.push(Self::entry_for(i, record, 0));
        }

        tracing::debug!(entries = entries.len(), "parsed MBR");

        Ok(Self {
            records,
            entries,
            logical: Vec::new(),
            disk_signature,
        })
    }

    /// Walk the EBR chain of the extended container, if any
    ///
    /// Each EBR's first record is a logical partition whose start is relative
    /// to that EBR. A nested extended record points at the next EBR, relative
    /// to the start of the outermost container. The walk stops at a missing
    /// signature, a revisited EBR, or after [`MAX_EBR_CHAIN`] links.
    pub fn read_extended(mut self, device: &mut dyn BlockDevice) -> Result<Self> {
        let Some(container) = self.extended_entry().cloned() else {
            return Ok(self);
        };

        let total = device.sector_count();
        let mut sector = [0u8; SECTOR_SIZE];
        let mut visited = HashSet::new();
        let mut next = Some(container.start_sector);

        for _ in 0..MAX_EBR_CHAIN {
            let Some(ebr_lba) = next.take() else {
                break;
            };

            if !visited.insert(ebr_lba) {
                tracing::warn!(ebr_lba, "EBR chain loops back on itself");
                break;
            }
            if ebr_lba >= total {
                tracing::warn!(ebr_lba, total, "EBR lies beyond the end of the device");
                break;
            }

            device.read_sector(ebr_lba, &mut sector)?;
            if !Self::has_signature(&sector) {
                tracing::warn!(ebr_lba, "EBR without boot signature ends the chain");
                break;
            }

            for slot in 0..Self::NUM_PARTITIONS {
                let record =
                    MbrRecord::parse(&sector, Self::PARTITION_TABLE_OFFSET + slot * MbrRecord::SIZE)?;
                if record.is_empty() || !record.is_valid() {
                    continue;
                }

                if record.is_extended() {
                    next = Some(container.start_sector + record.start_lba as u64);
                } else {
                    let index = Self::FIRST_LOGICAL_INDEX + self.logical.len();
                    self.logical.push(Self::entry_for(index, &record, ebr_lba));
                }
            }
        }

        if next.is_some() {
            tracing::warn!(limit = MAX_EBR_CHAIN, "EBR chain truncated");
        }

        tracing::debug!(logical = self.logical.len(), "walked EBR chain");
        Ok(self)
    }

    fn entry_for(index: usize, record: &MbrRecord, base_lba: u64) -> PartitionTableEntry {
        PartitionTableEntry::new(
            index,
            base_lba + record.start_lba as u64,
            record.sector_count as u64,
            PartitionTypeCode::Byte(record.system_indicator),
            ibm::lookup(record.system_indicator),
        )
        .with_bootable(record.is_bootable())
    }

    /// Drop entries that do not fit on a device of `device_sectors` sectors
    pub fn restrict_to(mut self, device_sectors: u64) -> Self {
        crate::retain_on_device(&mut self.entries, device_sectors, "MBR");
        crate::retain_on_device(&mut self.logical, device_sectors, "EBR");
        self
    }

    /// Get the disk signature
    pub fn disk_signature(&self) -> u32 {
        self.disk_signature
    }

    /// The four raw slots, empty ones included
    pub fn records(&self) -> &[MbrRecord; 4] {
        &self.records
    }

    /// Logical partitions found in the EBR chain
    pub fn logical_entries(&self) -> &[PartitionTableEntry] {
        &self.logical
    }

    /// The primary entry holding the EBR chain
    pub fn extended_entry(&self) -> Option<&PartitionTableEntry> {
        self.entries.iter().find(|e| match e.type_code {
            PartitionTypeCode::Byte(code) => ibm::is_extended(code),
            _ => false,
        })
    }

    /// Check if this MBR contains a GPT protective partition
    pub fn is_gpt_protective(&self) -> bool {
        self.entries.iter().any(|e| match e.type_code {
            PartitionTypeCode::Byte(code) => ibm::is_gpt_protective(code),
            _ => false,
        })
    }

    /// Index pairs of primary entries that share sectors
    pub fn overlapping_entries(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.entries.iter().enumerate() {
            for b in &self.entries[i + 1..] {
                if a.overlaps(b) {
                    pairs.push((a.index, b.index));
                }
            }
        }
        pairs
    }
}

impl ZoneTable for MbrZoneTable {
    fn identify(&self) -> &str {
        "Master Boot Record"
    }

    fn entries(&self) -> &[PartitionTableEntry] {
        &self.entries
    }
}
