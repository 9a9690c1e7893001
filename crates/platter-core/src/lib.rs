//! # Platter Core
//!
//! Core traits, types, and error handling for Platter.
//!
//! This crate provides the foundational abstractions for decoding storage media:
//! - **BlockDevice**: 512-byte sector storage (`read_sector`, `write_sector`, `length`, `flush`)
//! - **ZoneTable**: Parsed partition tables (MBR, GPT, APM)
//! - **Binary cursor**: Bounds-checked little/big-endian readers
//! - **DirectoryEntry**: Decoded filesystem directory records
//!
//! ## Terminology
//!
//! - **Vault** = Storage container (raw image, virtual disk)
//! - **Zone** = Partition
//! - **Territory** = File system structures
//! - **Extent** = Contiguous run of virtual-disk sectors backed by one file
//!
//! ## Example
//!
//! ```rust,no_run
//! use platter_core::{BlockDevice, Result, SECTOR_SIZE};
//!
//! fn dump_first_sector(device: &mut dyn BlockDevice) -> Result<()> {
//!     let mut sector = [0u8; SECTOR_SIZE];
//!     device.read_sector(0, &mut sector)?;
//!     println!("{}: {} sectors", device.identify(), device.sector_count());
//!     Ok(())
//! }
//! ```

pub mod bytes;
pub mod error;
pub mod limits;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use bytes::ByteCursor;
pub use error::{Error, Result};
pub use limits::*;
pub use traits::{sectors_for, BlockDevice, ReadSeek, ReadWriteSeek, ZoneTable, SECTOR_SIZE};
pub use types::{DirectoryEntry, PartitionTableEntry, PartitionTypeCode};
