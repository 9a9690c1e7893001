//! Zone table factory for automatic scheme detection
//!
//! Schemes are probed in a fixed priority order: GPT, then APM, then MBR.
//! A GPT disk also carries a protective MBR, so GPT has to win; APM and MBR
//! signatures live at different offsets and never collide.

use crate::{ApmZoneTable, GptZoneTable, MbrZoneTable};
use platter_core::{
    sectors_for, validate_allocation_size, BlockDevice, Result, ZoneTable, MAX_ALLOCATION_SIZE,
    SECTOR_SIZE, ZONE_PROBE_SIZE,
};

/// Detected partition scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneTableType {
    /// GUID Partition Table
    Gpt,
    /// Apple Partition Map
    Apm,
    /// Master Boot Record
    Mbr,
}

impl ZoneTableType {
    /// Probe order
    pub const PRIORITY: [ZoneTableType; 3] = [Self::Gpt, Self::Apm, Self::Mbr];

    /// Get a human-readable name for this scheme
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gpt => "GUID Partition Table",
            Self::Apm => "Apple Partition Map",
            Self::Mbr => "Master Boot Record",
        }
    }

    /// Smallest buffer in which the signature can be checked
    pub fn min_len(&self) -> usize {
        match self {
            Self::Gpt => 2 * SECTOR_SIZE,
            Self::Apm => 2 * SECTOR_SIZE,
            Self::Mbr => SECTOR_SIZE,
        }
    }

    /// Does `buf` carry this scheme's signature?
    pub fn matches(&self, buf: &[u8]) -> bool {
        if buf.len() < self.min_len() {
            return false;
        }
        match self {
            Self::Gpt => GptZoneTable::has_signature(buf),
            Self::Apm => ApmZoneTable::has_signature(buf),
            Self::Mbr => MbrZoneTable::contains_partition_table(buf),
        }
    }

    fn parse(&self, buf: &[u8], device_sectors: Option<u64>) -> Result<Box<dyn ZoneTable>> {
        Ok(match (self, device_sectors) {
            (Self::Gpt, None) => Box::new(GptZoneTable::parse(buf)?),
            (Self::Gpt, Some(n)) => Box::new(GptZoneTable::parse(buf)?.restrict_to(n)),
            (Self::Apm, None) => Box::new(ApmZoneTable::parse(buf)?),
            (Self::Apm, Some(n)) => Box::new(ApmZoneTable::parse(buf)?.restrict_to(n)),
            (Self::Mbr, None) => Box::new(MbrZoneTable::parse(buf)?),
            (Self::Mbr, Some(n)) => Box::new(MbrZoneTable::parse(buf)?.restrict_to(n)),
        })
    }
}

impl std::fmt::Display for ZoneTableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// First scheme in priority order whose signature is present
pub fn detect_type(buf: &[u8]) -> Option<ZoneTableType> {
    ZoneTableType::PRIORITY
        .into_iter()
        .find(|kind| kind.matches(buf))
}

/// Detect and parse a partition table from the first bytes of a device
///
/// Returns `None` when no scheme is recognized. A scheme whose signature
/// matches but whose body fails to parse is skipped in favour of the next.
pub fn detect_zone_table(buf: &[u8]) -> Option<Box<dyn ZoneTable>> {
    detect_with_limit(buf, None)
}

fn detect_with_limit(buf: &[u8], device_sectors: Option<u64>) -> Option<Box<dyn ZoneTable>> {
    for kind in ZoneTableType::PRIORITY {
        if !kind.matches(buf) {
            continue;
        }
        match kind.parse(buf, device_sectors) {
            Ok(table) => {
                tracing::debug!(scheme = kind.name(), entries = table.entries().len(), "detected zone table");
                return Some(table);
            }
            Err(e) => {
                tracing::warn!(scheme = kind.name(), error = %e, "signature present but table unreadable");
            }
        }
    }
    None
}

/// Read the probe window of a device and parse its partition table
///
/// For GPT the window is widened to cover the whole entry array. MBR
/// tables also get their EBR chain walked. Entries that run past the end
/// of the device are dropped.
pub fn read_zone_table(device: &mut dyn BlockDevice) -> Result<Option<Box<dyn ZoneTable>>> {
    let device_sectors = device.sector_count();
    let device_bytes = device_sectors.saturating_mul(SECTOR_SIZE as u64);

    let probe_len = (ZONE_PROBE_SIZE as u64).min(device_bytes) as usize;
    let mut buf = read_prefix(device, probe_len)?;

    let Some(kind) = detect_type(&buf) else {
        tracing::debug!("no partition table signature found");
        return Ok(None);
    };

    if kind == ZoneTableType::Gpt {
        if let Some(needed) = GptZoneTable::required_len(&buf) {
            let needed = needed.min(device_bytes);
            if needed > buf.len() as u64 {
                let needed = validate_allocation_size(needed, MAX_ALLOCATION_SIZE, "GPT entry array")?;
                buf = read_prefix(device, needed)?;
            }
        }
    }

    if kind == ZoneTableType::Mbr {
        // The EBR walk needs the device, so the MBR path bypasses the generic dispatch
        match MbrZoneTable::parse(&buf) {
            Ok(table) => {
                let table = table.read_extended(device)?.restrict_to(device_sectors);
                return Ok(Some(Box::new(table)));
            }
            Err(e) => {
                tracing::warn!(error = %e, "MBR signature present but table unreadable");
                return Ok(None);
            }
        }
    }

    Ok(detect_with_limit(&buf, Some(device_sectors)))
}

/// Read `len` bytes from the start of the device, rounded up to whole sectors
fn read_prefix(device: &mut dyn BlockDevice, len: usize) -> Result<Vec<u8>> {
    let sectors = sectors_for(len);
    let mut buf = vec![0u8; sectors as usize * SECTOR_SIZE];
    if !buf.is_empty() {
        device.read_sector(0, &mut buf)?;
    }
    Ok(buf)
}
