//! Vault factory for automatic format detection
//!
//! Virtual disks are recognized by content only: a sparse extent starts with
//! "KDMV", a standalone descriptor with `# Disk DescriptorFile`. Flat extent
//! files share the `.vmdk` extension with descriptors but are plain sector
//! data, so extensions never select the virtual-disk handler.

use crate::vdisk::{SparseExtentHeader, VirtualDisk, VirtualDiskConfig, DESCRIPTOR_MARKER};
use crate::{RawVault, VaultConfig};
use platter_core::{BlockDevice, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Detected vault type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultType {
    /// Raw sector image
    Raw,
    /// Descriptor-addressed virtual disk (text descriptor or monolithic sparse)
    VirtualDisk,
}

impl VaultType {
    /// Get a human-readable name for this vault type
    pub fn name(&self) -> &'static str {
        match self {
            VaultType::Raw => "Raw Sector Image",
            VaultType::VirtualDisk => "Virtual Disk",
        }
    }
}

impl std::fmt::Display for VaultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bytes read from the start of a file for detection
const PROBE_LEN: usize = 64;

/// Detect the vault type of a file from its first bytes
pub fn detect_vault_type(path: &Path) -> Result<VaultType> {
    let mut file = File::open(path)?;
    let mut probe = [0u8; PROBE_LEN];
    let mut filled = 0;
    while filled < PROBE_LEN {
        let n = file.read(&mut probe[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(detect_from_bytes(&probe[..filled]))
}

/// Classify a file from its leading bytes
pub fn detect_from_bytes(probe: &[u8]) -> VaultType {
    if probe.starts_with(SparseExtentHeader::MAGIC_BYTES) {
        return VaultType::VirtualDisk;
    }
    let text_start = probe
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(probe.len());
    if probe[text_start..].starts_with(DESCRIPTOR_MARKER.as_bytes()) {
        return VaultType::VirtualDisk;
    }
    VaultType::Raw
}

/// Open any supported vault with automatic detection
///
/// # Example
///
/// ```rust,no_run
/// use platter_core::BlockDevice;
/// use platter_vaults::{open_vault, VaultConfig};
/// use std::path::Path;
///
/// let vault = open_vault(Path::new("disk.vmdk"), VaultConfig::default()).unwrap();
/// println!("Vault type: {}", vault.identify());
/// println!("Size: {} bytes", vault.length());
/// ```
pub fn open_vault(path: &Path, config: VaultConfig) -> Result<Box<dyn BlockDevice>> {
    let vault_type = detect_vault_type(path)?;
    tracing::debug!(path = %path.display(), vault_type = vault_type.name(), "detected vault type");
    open_vault_as(path, vault_type, config)
}

/// Open a vault as a specific type, skipping detection
pub fn open_vault_as(path: &Path, vault_type: VaultType, config: VaultConfig) -> Result<Box<dyn BlockDevice>> {
    Ok(match vault_type {
        VaultType::Raw => Box::new(RawVault::open(path, config)?),
        VaultType::VirtualDisk => Box::new(VirtualDisk::open(
            path,
            VirtualDiskConfig {
                read_only: config.read_only,
            },
        )?),
    })
}
