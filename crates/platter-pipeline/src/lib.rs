//! # Platter Pipeline
//!
//! Stream and sector-window adapters for Platter.
//!
//! This crate provides:
//! - **MmapPipeline**: Read-only memory-mapped image, usable as a stream or a block device
//! - **PartialDevice**: Sector window into a parent block device (one partition)
//!
//! ## Example
//!
//! ```rust,no_run
//! use platter_core::{BlockDevice, SECTOR_SIZE};
//! use platter_pipeline::{MmapPipeline, PartialDevice};
//! use std::path::Path;
//!
//! let image = MmapPipeline::open(Path::new("disk.img")).unwrap();
//!
//! // Present sectors 2048..206848 as their own device
//! let mut partition = PartialDevice::new(image, 2048, 204800).unwrap();
//!
//! let mut sector = [0u8; SECTOR_SIZE];
//! partition.read_sector(0, &mut sector).unwrap();
//! ```

pub mod mmap;
pub mod partial;

pub use mmap::MmapPipeline;
pub use partial::PartialDevice;
