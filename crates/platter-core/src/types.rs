//! Core types for Platter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw partition type code as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PartitionTypeCode {
    /// MBR/IBM system indicator byte
    Byte(u8),
    /// GPT type GUID in on-disk (mixed-endian) byte order
    Guid([u8; 16]),
    /// APM type string
    Ascii(String),
}

impl fmt::Display for PartitionTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(b) => write!(f, "0x{:02X}", b),
            Self::Guid(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Self::Ascii(s) => write!(f, "{}", s),
        }
    }
}

/// One partition record from a zone table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTableEntry {
    /// Slot of this record in the on-disk entry array
    pub index: usize,

    /// First sector of the partition
    pub start_sector: u64,

    /// Number of sectors in the partition
    pub sector_count: u64,

    /// Raw type code
    pub type_code: PartitionTypeCode,

    /// Symbolic type name resolved through the registry (`UNKNOWN` if none)
    pub type_name: String,

    /// Boot/active flag
    pub bootable: bool,

    /// Partition name as stored on disk (empty for MBR)
    pub raw_name: String,
}

impl PartitionTableEntry {
    /// Create a new entry
    pub fn new(
        index: usize,
        start_sector: u64,
        sector_count: u64,
        type_code: PartitionTypeCode,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            index,
            start_sector,
            sector_count,
            type_code,
            type_name: type_name.into(),
            bootable: false,
            raw_name: String::new(),
        }
    }

    /// Set the boot flag
    pub fn with_bootable(mut self, bootable: bool) -> Self {
        self.bootable = bootable;
        self
    }

    /// Set the on-disk name
    pub fn with_raw_name(mut self, raw_name: impl Into<String>) -> Self {
        self.raw_name = raw_name.into();
        self
    }

    /// One past the last sector of the partition
    pub fn end_sector(&self) -> u64 {
        self.start_sector.saturating_add(self.sector_count)
    }

    /// Byte offset of the partition on the device
    pub fn byte_offset(&self) -> u64 {
        self.start_sector.saturating_mul(crate::SECTOR_SIZE as u64)
    }

    /// Size of the partition in bytes
    pub fn byte_length(&self) -> u64 {
        self.sector_count.saturating_mul(crate::SECTOR_SIZE as u64)
    }

    /// Does the partition fit on a device of `device_sectors` sectors?
    pub fn fits_within(&self, device_sectors: u64) -> bool {
        self.start_sector
            .checked_add(self.sector_count)
            .map_or(false, |end| end <= device_sectors)
    }

    /// Do two partitions share at least one sector?
    pub fn overlaps(&self, other: &PartitionTableEntry) -> bool {
        self.sector_count > 0
            && other.sector_count > 0
            && self.start_sector < other.end_sector()
            && other.start_sector < self.end_sector()
    }
}

impl fmt::Display for PartitionTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Zone {} [{} @ sector {}, {} sectors]",
            self.index, self.type_name, self.start_sector, self.sector_count
        )?;
        if self.bootable {
            write!(f, " *")?;
        }
        if !self.raw_name.is_empty() {
            write!(f, " \"{}\"", self.raw_name)?;
        }
        Ok(())
    }
}

/// A decoded filesystem directory entry
///
/// `inode` is always widened to 64 bits; the on-disk width belongs to the
/// owning directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Inode number the entry points at
    pub inode: u64,

    /// Entry name (lossy UTF-8)
    pub name: String,

    /// Bytes the record occupies on disk
    pub record_length: usize,

    /// Format-specific tag (XFS) or byte offset of the record (ext2)
    pub tag_or_offset: u64,

    /// File type byte when the format stores one
    pub file_type: Option<u8>,
}

impl DirectoryEntry {
    /// Is this the `.` or `..` entry?
    pub fn is_dot_entry(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10} {}", self.inode, self.name)
    }
}
