//! Apple partition map structures
//!
//! All multi-byte fields are big-endian.

use platter_core::{bytes, Result};
use serde::Serialize;

/// Driver descriptor record in block 0
#[derive(Debug, Clone, Serialize)]
pub struct DriverDescriptor {
    /// Device block size in bytes
    pub block_size: u16,
    /// Device size in blocks
    pub block_count: u32,
    /// Number of driver descriptor entries that follow
    pub driver_count: u16,
}

impl DriverDescriptor {
    /// "ER"
    pub const SIGNATURE: &'static [u8; 2] = b"ER";

    /// Parse block 0, `None` if it carries no driver descriptor
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        if bytes::read_bytes(data, 0, 2)? != Self::SIGNATURE {
            return Ok(None);
        }
        Ok(Some(Self {
            block_size: bytes::read_be_u16(data, 2)?,
            block_count: bytes::read_be_u32(data, 4)?,
            driver_count: bytes::read_be_u16(data, 16)?,
        }))
    }
}

/// One 512-byte partition map entry
///
/// ```text
/// Offset  Size  Field
/// 0x00    2     Signature "PM"
/// 0x04    4     Number of entries in the map
/// 0x08    4     First physical block of the partition
/// 0x0C    4     Partition size in blocks
/// 0x10    32    Partition name
/// 0x30    31    Partition type, null-padded (byte 0x4F unused)
/// 0x50    4     First logical block of the data area
/// 0x54    4     Data area size in blocks
/// 0x58    4     Status flags
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApmEntry {
    pub map_entries: u32,
    pub start_block: u32,
    pub block_count: u32,
    pub name: String,
    pub type_string: String,
    pub data_start: u32,
    pub data_count: u32,
    pub status: u32,
}

impl ApmEntry {
    /// "PM"
    pub const SIGNATURE: &'static [u8; 2] = b"PM";

    /// Size of one entry
    pub const ENTRY_SIZE: usize = 512;

    /// Width of the name field
    pub const NAME_LEN: usize = 32;

    /// Width of the type string
    pub const TYPE_LEN: usize = 31;

    pub const STATUS_VALID: u32 = 0x01;
    pub const STATUS_ALLOCATED: u32 = 0x02;
    pub const STATUS_IN_USE: u32 = 0x04;
    pub const STATUS_BOOTABLE: u32 = 0x08;
    pub const STATUS_READABLE: u32 = 0x10;
    pub const STATUS_WRITABLE: u32 = 0x20;

    /// Decode the entry at `offset`, `None` if the "PM" signature is absent
    pub fn parse(data: &[u8], offset: usize) -> Result<Option<Self>> {
        let raw = bytes::read_bytes(data, offset, Self::ENTRY_SIZE)?;
        if &raw[0..2] != Self::SIGNATURE {
            return Ok(None);
        }

        Ok(Some(Self {
            map_entries: bytes::read_be_u32(raw, 0x04)?,
            start_block: bytes::read_be_u32(raw, 0x08)?,
            block_count: bytes::read_be_u32(raw, 0x0C)?,
            name: bytes::read_ascii_z(raw, 0x10, Self::NAME_LEN)?,
            type_string: bytes::read_ascii_z(raw, 0x30, Self::TYPE_LEN)?,
            data_start: bytes::read_be_u32(raw, 0x50)?,
            data_count: bytes::read_be_u32(raw, 0x54)?,
            status: bytes::read_be_u32(raw, 0x58)?,
        }))
    }

    pub fn is_bootable(&self) -> bool {
        self.status & Self::STATUS_BOOTABLE != 0
    }
}
