//! Multi-extent virtual disks
//!
//! A virtual disk is a text descriptor listing extents in address order.
//! Each extent is backed by its own file (flat or sparse) or reads as zeros.
//! The descriptor may be a standalone text file or embedded in a monolithic
//! sparse extent.

pub mod cache;
pub mod descriptor;
pub mod extent;
pub mod io;
pub mod sparse;
pub mod translator;

pub use cache::ExtentCache;
pub use descriptor::{Descriptor, DescriptorHeader, Geometry, DESCRIPTOR_MARKER};
pub use extent::{Access, ExtentDeclaration, ExtentKind};
pub use io::ExtentHandle;
pub use sparse::{create_sparse_extent, SparseExtentHeader, SparseExtentIo};
pub use translator::DiskAddressTranslator;

use platter_core::{BlockDevice, Error, Result, MAX_DESCRIPTOR_SIZE, SECTOR_SIZE};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Options for opening a virtual disk
#[derive(Debug, Clone, Default)]
pub struct VirtualDiskConfig {
    /// Reject every write, regardless of extent access modes
    pub read_only: bool,
}

/// Open virtual-disk session
///
/// Extent files are opened on first access and closed by [`flush`] or when
/// the session ends. Dropping the session flushes; use [`close`] to observe
/// flush errors.
///
/// [`flush`]: BlockDevice::flush
/// [`close`]: VirtualDisk::close
///
/// # Example
///
/// ```rust,no_run
/// use platter_core::{BlockDevice, SECTOR_SIZE};
/// use platter_vaults::vdisk::{VirtualDisk, VirtualDiskConfig};
/// use std::path::Path;
///
/// let mut disk = VirtualDisk::open(Path::new("disk.vmdk"), VirtualDiskConfig::default()).unwrap();
/// let mut sector = [0u8; SECTOR_SIZE];
/// disk.read(0, &mut sector).unwrap();
/// disk.close().unwrap();
/// ```
#[derive(Debug)]
pub struct VirtualDisk {
    path: PathBuf,
    descriptor: Descriptor,
    translator: DiskAddressTranslator,
    cache: ExtentCache,
    config: VirtualDiskConfig,
}

impl VirtualDisk {
    /// Open a descriptor file or a sparse extent with an embedded descriptor
    ///
    /// Extent file names resolve against the directory of `path`.
    pub fn open(path: &Path, config: VirtualDiskConfig) -> Result<Self> {
        let descriptor = read_descriptor(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut disk = Self::from_descriptor(descriptor, base_dir, config)?;
        disk.path = path.to_path_buf();
        Ok(disk)
    }

    /// Build a session from an already parsed descriptor
    pub fn from_descriptor(descriptor: Descriptor, base_dir: &Path, config: VirtualDiskConfig) -> Result<Self> {
        let translator = DiskAddressTranslator::new(&descriptor.extents)?;
        let cache = ExtentCache::new(base_dir, descriptor.extents.len(), config.read_only);

        tracing::debug!(
            base_dir = %base_dir.display(),
            extents = descriptor.extents.len(),
            total_sectors = translator.total_sectors(),
            read_only = config.read_only,
            "opened virtual disk"
        );

        Ok(Self {
            path: base_dir.to_path_buf(),
            descriptor,
            translator,
            cache,
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn translator(&self) -> &DiskAddressTranslator {
        &self.translator
    }

    pub fn total_sectors(&self) -> u64 {
        self.translator.total_sectors()
    }

    /// Extent declaration and local sector holding `sector`
    pub fn locate(&self, sector: i64) -> Result<(&ExtentDeclaration, u64)> {
        let (index, local) = self.translator.translate(sector)?;
        Ok((&self.descriptor.extents[index], local))
    }

    /// Read `buf.len()` bytes starting at `sector`
    ///
    /// The request is split into single-sector reads, each routed to its
    /// extent. A short trailing chunk reads only its prefix.
    pub fn read(&mut self, sector: i64, buf: &mut [u8]) -> Result<()> {
        self.translator.check_bounds(sector, buf.len())?;

        let mut scratch = [0u8; SECTOR_SIZE];
        for (i, chunk) in buf.chunks_mut(SECTOR_SIZE).enumerate() {
            let (index, local) = self.translator.translate(sector + i as i64)?;
            let extent = &self.descriptor.extents[index];
            if !extent.access.can_read() {
                return Err(Error::permission_denied(format!("extent {} is NOACCESS", index)));
            }

            let handle = self.cache.get_handle(index, extent)?;
            if chunk.len() == SECTOR_SIZE {
                handle.read_sector(local, chunk)?;
            } else {
                handle.read_sector(local, &mut scratch)?;
                chunk.copy_from_slice(&scratch[..chunk.len()]);
            }
        }
        Ok(())
    }

    /// Write `buf` starting at `sector`
    ///
    /// Every touched extent is checked for write access and kind, and its
    /// backing file opened, before the first byte is written. A short
    /// trailing chunk is merged into the existing sector.
    pub fn write(&mut self, sector: i64, buf: &[u8]) -> Result<()> {
        self.translator.check_bounds(sector, buf.len())?;
        if self.config.read_only {
            return Err(Error::permission_denied("virtual disk opened read-only"));
        }

        let count = buf.len().div_ceil(SECTOR_SIZE);
        let mut touched: Vec<usize> = Vec::new();
        for i in 0..count {
            let (index, _) = self.translator.translate(sector + i as i64)?;
            if touched.last() != Some(&index) {
                touched.push(index);
            }
        }
        for &index in &touched {
            let extent = &self.descriptor.extents[index];
            if !extent.access.can_write() {
                return Err(Error::permission_denied(format!(
                    "extent {} is {}",
                    index, extent.access
                )));
            }
            extent.kind.check_writable()?;
        }
        for &index in &touched {
            self.cache.get_handle(index, &self.descriptor.extents[index])?;
        }

        let mut scratch = [0u8; SECTOR_SIZE];
        for (i, chunk) in buf.chunks(SECTOR_SIZE).enumerate() {
            let (index, local) = self.translator.translate(sector + i as i64)?;
            let handle = self.cache.get_handle(index, &self.descriptor.extents[index])?;
            if chunk.len() == SECTOR_SIZE {
                handle.write_sector(local, chunk)?;
            } else {
                handle.read_sector(local, &mut scratch)?;
                scratch[..chunk.len()].copy_from_slice(chunk);
                handle.write_sector(local, &scratch)?;
            }
        }
        Ok(())
    }

    /// Flush and close all extent files, reporting the first failure
    pub fn close(mut self) -> Result<()> {
        self.cache.flush()
    }
}

impl BlockDevice for VirtualDisk {
    fn identify(&self) -> &str {
        "Virtual disk"
    }

    fn read_sector(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        let sector = i64::try_from(index).map_err(|_| Error::bounds(i64::MAX, self.total_sectors()))?;
        self.read(sector, buf)
    }

    fn write_sector(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        let sector = i64::try_from(index).map_err(|_| Error::bounds(i64::MAX, self.total_sectors()))?;
        self.write(sector, buf)
    }

    fn length(&self) -> u64 {
        self.descriptor.length()
    }

    fn flush(&mut self) -> Result<()> {
        self.cache.flush()
    }
}

impl Drop for VirtualDisk {
    fn drop(&mut self) {
        if let Err(e) = self.cache.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "flush on drop failed");
        }
    }
}

/// Load the descriptor from a text file or a sparse extent's embedded copy
pub fn read_descriptor(path: &Path) -> Result<Descriptor> {
    let mut file = File::open(path)?;

    let mut magic = [0u8; 4];
    let read = file.read(&mut magic)?;
    if read == magic.len() && &magic == SparseExtentHeader::MAGIC_BYTES {
        let header = SparseExtentHeader::read_from(&mut file)?;
        let text = header
            .read_embedded_descriptor(&mut file)?
            .ok_or_else(|| Error::format("Sparse extent carries no embedded descriptor"))?;
        return Descriptor::from_bytes(&text);
    }

    let len = file.metadata()?.len();
    if len > MAX_DESCRIPTOR_SIZE as u64 {
        return Err(Error::format(format!(
            "{} is {} bytes, too large for a descriptor",
            path.display(),
            len
        )));
    }
    let mut text = magic[..read].to_vec();
    file.read_to_end(&mut text)?;
    Descriptor::from_bytes(&text)
}
