//! # Platter Vaults
//!
//! Storage containers exposed as block devices.
//!
//! This crate provides:
//! - **RawVault**: Plain sector images, files or in-memory buffers
//! - **VirtualDisk**: Descriptor-addressed disks built from flat, sparse and
//!   zero extents
//!
//! ## Example
//!
//! ```rust,no_run
//! use platter_core::BlockDevice;
//! use platter_vaults::{open_vault, VaultConfig};
//! use std::path::Path;
//!
//! // Open any supported format with auto-detection
//! let vault = open_vault(Path::new("disk.vmdk"), VaultConfig::default()).unwrap();
//!
//! println!("Type: {}", vault.identify());
//! println!("Size: {} bytes", vault.length());
//! ```

pub mod factory;
pub mod raw;
pub mod vdisk;

pub use factory::{detect_vault_type, open_vault, open_vault_as, VaultType};
pub use raw::{RawVault, VaultConfig};
pub use vdisk::{Descriptor, VirtualDisk, VirtualDiskConfig};
