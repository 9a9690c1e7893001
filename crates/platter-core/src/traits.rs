//! Core traits for Platter

use crate::{error::Result, types::PartitionTableEntry};
use std::io::{Read, Seek, Write};

/// Fixed sector size used throughout Platter
pub const SECTOR_SIZE: usize = 512;

/// Number of sectors needed to hold `bytes` bytes (rounded up)
pub fn sectors_for(bytes: usize) -> u64 {
    ((bytes + SECTOR_SIZE - 1) / SECTOR_SIZE) as u64
}

/// Byte-addressable storage exposed in 512-byte sectors
///
/// A buffer passed to `read_sector`/`write_sector` may span several sectors:
/// `ceil(buf.len() / SECTOR_SIZE)` sectors starting at `index` are covered.
/// Implementations validate the whole range before touching storage.
pub trait BlockDevice: Send {
    /// Human-readable identifier for this device type
    fn identify(&self) -> &str;

    /// Read sectors starting at `index` into `buf`
    fn read_sector(&mut self, index: u64, buf: &mut [u8]) -> Result<()>;

    /// Write `buf` to sectors starting at `index`
    fn write_sector(&mut self, index: u64, buf: &[u8]) -> Result<()>;

    /// Total size in bytes
    fn length(&self) -> u64;

    /// Push buffered writes to the backing storage
    fn flush(&mut self) -> Result<()>;

    /// Total number of addressable sectors
    fn sector_count(&self) -> u64 {
        self.length() / SECTOR_SIZE as u64
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for Box<D> {
    fn identify(&self) -> &str {
        (**self).identify()
    }

    fn read_sector(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_sector(index, buf)
    }

    fn write_sector(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        (**self).write_sector(index, buf)
    }

    fn length(&self) -> u64 {
        (**self).length()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn identify(&self) -> &str {
        (**self).identify()
    }

    fn read_sector(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_sector(index, buf)
    }

    fn write_sector(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        (**self).write_sector(index, buf)
    }

    fn length(&self) -> u64 {
        (**self).length()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Trait for partition tables (zone tables)
///
/// Tables are immutable snapshots of what was on disk when they were parsed.
pub trait ZoneTable: Send + Sync {
    /// Get a human-readable identifier for this zone table type
    fn identify(&self) -> &str;

    /// Get all valid entries in this partition table
    fn entries(&self) -> &[PartitionTableEntry];

    /// Get a specific entry by position
    fn get_entry(&self, index: usize) -> Option<&PartitionTableEntry> {
        self.entries().get(index)
    }

    /// Iterate over the entries
    fn iter(&self) -> std::slice::Iter<'_, PartitionTableEntry> {
        self.entries().iter()
    }
}

/// Combined trait for Read + Seek
pub trait ReadSeek: Read + Seek + Send {}

/// Blanket implementation for any type that implements Read + Seek
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Combined trait for Read + Write + Seek
pub trait ReadWriteSeek: Read + Write + Seek + Send {}

/// Blanket implementation for any type that implements Read + Write + Seek
impl<T: Read + Write + Seek + Send> ReadWriteSeek for T {}
