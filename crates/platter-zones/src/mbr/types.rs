//! MBR partition records and CHS addressing

use platter_core::{bytes, Result};
use serde::Serialize;
use std::fmt;

/// CHS (Cylinder-Head-Sector) address
///
/// Traditional disk addressing using physical geometry.
/// Maximum values: 1023 cylinders, 255 heads, 63 sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChsAddress {
    pub cylinder: u16,
    pub head: u8,
    pub sector: u8,
}

impl ChsAddress {
    /// Decode a packed 3-byte CHS tuple
    ///
    /// - Byte 0: head
    /// - Byte 1: sector (bits 0-5), cylinder bits 8-9 (bits 6-7)
    /// - Byte 2: cylinder bits 0-7
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        let cyl_high = ((bytes[1] & 0xC0) as u16) << 2;
        Self {
            cylinder: cyl_high | bytes[2] as u16,
            head: bytes[0],
            sector: bytes[1] & 0x3F,
        }
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        let cyl_high = ((self.cylinder >> 8) & 0x03) as u8;
        [
            self.head,
            (self.sector & 0x3F) | (cyl_high << 6),
            (self.cylinder & 0xFF) as u8,
        ]
    }

    /// Convert to an LBA for the given geometry
    ///
    /// Returns `None` for sector 0, which CHS never uses.
    pub fn to_lba(&self, heads_per_cylinder: u32, sectors_per_track: u32) -> Option<u64> {
        let s = (self.sector as u64).checked_sub(1)?;
        let c = self.cylinder as u64;
        let h = self.head as u64;
        Some((c * heads_per_cylinder as u64 + h) * sectors_per_track as u64 + s)
    }
}

impl fmt::Display for ChsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C:{}/H:{}/S:{}", self.cylinder, self.head, self.sector)
    }
}

/// One 16-byte partition record as stored in an MBR or EBR
///
/// ```text
/// Offset  Size  Field
/// 0x00    1     Boot indicator (0x00 or 0x80)
/// 0x01    3     CHS of first sector
/// 0x04    1     System indicator (partition type)
/// 0x05    3     CHS of last sector
/// 0x08    4     LBA of first sector (LE)
/// 0x0C    4     Number of sectors (LE)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MbrRecord {
    pub boot_indicator: u8,
    pub chs_start: ChsAddress,
    pub system_indicator: u8,
    pub chs_end: ChsAddress,
    pub start_lba: u32,
    pub sector_count: u32,
}

impl MbrRecord {
    /// Size of one record
    pub const SIZE: usize = 16;

    /// Decode the record at `offset`
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let raw = bytes::read_bytes(data, offset, Self::SIZE)?;
        Ok(Self {
            boot_indicator: raw[0],
            chs_start: ChsAddress::from_bytes(bytes::read_array(raw, 1)?),
            system_indicator: raw[4],
            chs_end: ChsAddress::from_bytes(bytes::read_array(raw, 5)?),
            start_lba: bytes::read_le_u32(raw, 8)?,
            sector_count: bytes::read_le_u32(raw, 12)?,
        })
    }

    /// Encode back into 16 bytes
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0] = self.boot_indicator;
        out[1..4].copy_from_slice(&self.chs_start.to_bytes());
        out[4] = self.system_indicator;
        out[5..8].copy_from_slice(&self.chs_end.to_bytes());
        out[8..12].copy_from_slice(&self.start_lba.to_le_bytes());
        out[12..16].copy_from_slice(&self.sector_count.to_le_bytes());
        out
    }

    /// Only 0x00 and 0x80 are legal boot indicators
    pub fn is_valid(&self) -> bool {
        self.boot_indicator == 0x00 || self.boot_indicator == 0x80
    }

    pub fn is_bootable(&self) -> bool {
        self.boot_indicator == 0x80
    }

    /// Unused slot: no type or no sectors
    pub fn is_empty(&self) -> bool {
        self.system_indicator == 0 || self.sector_count == 0
    }

    pub fn is_extended(&self) -> bool {
        crate::registry::ibm::is_extended(self.system_indicator)
    }
}
