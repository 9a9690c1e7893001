//! GPT header and partition entry structures

use crate::guid::Guid;
use platter_core::{bytes, Error, Result};
use serde::Serialize;

/// GPT partition entry
///
/// Entries are at least 128 bytes; larger entry sizes pad the tail.
#[derive(Debug, Clone, Serialize)]
pub struct GptPartitionEntry {
    /// Partition type GUID
    pub type_guid: Guid,
    /// Unique partition GUID
    pub unique_guid: Guid,
    /// First LBA (inclusive)
    pub first_lba: u64,
    /// Last LBA (inclusive)
    pub last_lba: u64,
    /// Attribute flags
    pub attributes: u64,
    /// Partition name (UTF-16LE, 72 bytes = 36 code units)
    pub name: String,
}

impl GptPartitionEntry {
    /// Minimum size of a partition entry in bytes
    pub const ENTRY_SIZE: usize = 128;

    /// Attribute bit: required for the platform to function
    pub const ATTR_REQUIRED: u64 = 1 << 0;
    /// Attribute bit: firmware must not produce a block I/O protocol
    pub const ATTR_NO_BLOCK_IO: u64 = 1 << 1;
    /// Attribute bit: legacy BIOS bootable
    pub const ATTR_LEGACY_BOOTABLE: u64 = 1 << 2;

    /// Parse a partition entry at `offset`
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let raw = bytes::read_bytes(data, offset, Self::ENTRY_SIZE)?;

        Ok(Self {
            type_guid: Guid(bytes::read_array(raw, 0)?),
            unique_guid: Guid(bytes::read_array(raw, 16)?),
            first_lba: bytes::read_le_u64(raw, 32)?,
            last_lba: bytes::read_le_u64(raw, 40)?,
            attributes: bytes::read_le_u64(raw, 48)?,
            name: Self::parse_name(&raw[56..128]),
        })
    }

    /// Check if this entry is unused
    pub fn is_unused(&self) -> bool {
        self.type_guid.is_zero()
    }

    pub fn is_legacy_bootable(&self) -> bool {
        self.attributes & Self::ATTR_LEGACY_BOOTABLE != 0
    }

    /// Get the size of this partition in LBA sectors
    pub fn size_lba(&self) -> u64 {
        if self.last_lba >= self.first_lba {
            self.last_lba - self.first_lba + 1
        } else {
            0
        }
    }

    fn parse_name(raw: &[u8]) -> String {
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();
        String::from_utf16_lossy(&units)
    }
}

/// GPT header
#[derive(Debug, Clone, Serialize)]
pub struct GptHeader {
    /// GPT revision (usually 0x00010000)
    pub revision: u32,
    /// Header size in bytes (usually 92)
    pub header_size: u32,
    /// CRC32 checksum of header
    pub header_crc32: u32,
    /// Current LBA (location of this header)
    pub current_lba: u64,
    /// Backup LBA (location of backup header)
    pub backup_lba: u64,
    /// First usable LBA for partitions
    pub first_usable_lba: u64,
    /// Last usable LBA for partitions
    pub last_usable_lba: u64,
    /// Disk GUID
    pub disk_guid: Guid,
    /// Starting LBA of partition entries
    pub partition_entries_lba: u64,
    /// Number of partition entries
    pub num_partition_entries: u32,
    /// Size of each partition entry
    pub partition_entry_size: u32,
    /// CRC32 of partition entries array
    pub partition_entries_crc32: u32,
}

impl GptHeader {
    /// GPT header signature
    pub const SIGNATURE: &'static [u8; 8] = b"EFI PART";

    /// Minimum header size
    pub const HEADER_SIZE: usize = 92;

    /// Parse a GPT header starting at `offset`
    ///
    /// # Errors
    ///
    /// Format error if the signature is wrong or the entry size is below
    /// 128 bytes; truncation if the buffer ends inside the header.
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let raw = bytes::read_bytes(data, offset, Self::HEADER_SIZE)?;

        if &raw[0..8] != Self::SIGNATURE {
            return Err(Error::format("Invalid GPT header signature"));
        }

        let header = Self {
            revision: bytes::read_le_u32(raw, 8)?,
            header_size: bytes::read_le_u32(raw, 12)?,
            header_crc32: bytes::read_le_u32(raw, 16)?,
            current_lba: bytes::read_le_u64(raw, 24)?,
            backup_lba: bytes::read_le_u64(raw, 32)?,
            first_usable_lba: bytes::read_le_u64(raw, 40)?,
            last_usable_lba: bytes::read_le_u64(raw, 48)?,
            disk_guid: Guid(bytes::read_array(raw, 56)?),
            partition_entries_lba: bytes::read_le_u64(raw, 72)?,
            num_partition_entries: bytes::read_le_u32(raw, 80)?,
            partition_entry_size: bytes::read_le_u32(raw, 84)?,
            partition_entries_crc32: bytes::read_le_u32(raw, 88)?,
        };

        if (header.partition_entry_size as usize) < GptPartitionEntry::ENTRY_SIZE {
            return Err(Error::format(format!(
                "GPT entry size {} is below {}",
                header.partition_entry_size,
                GptPartitionEntry::ENTRY_SIZE
            )));
        }

        Ok(header)
    }

    /// Byte range `(offset, length)` of the entry array on the device
    pub fn entry_array_extent(&self) -> Option<(u64, u64)> {
        let offset = self.partition_entries_lba.checked_mul(512)?;
        let length =
            (self.num_partition_entries as u64).checked_mul(self.partition_entry_size as u64)?;
        Some((offset, length))
    }

    /// Verify the header CRC32 over `header_size` bytes with the CRC field zeroed
    ///
    /// `header_bytes` starts at the signature.
    pub fn verify_header_crc32(&self, header_bytes: &[u8]) -> bool {
        let size = self.header_size as usize;
        if size < Self::HEADER_SIZE || size > 512 || header_bytes.len() < size {
            return false;
        }

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header_bytes[..16]);
        hasher.update(&[0u8; 4]);
        hasher.update(&header_bytes[20..size]);
        hasher.finalize() == self.header_crc32
    }

    /// Verify the partition entry array CRC32
    pub fn verify_partition_entries_crc32(&self, entry_array: &[u8]) -> bool {
        let expected = self.num_partition_entries as usize * self.partition_entry_size as usize;
        if entry_array.len() < expected {
            return false;
        }
        crc32fast::hash(&entry_array[..expected]) == self.partition_entries_crc32
    }
}
