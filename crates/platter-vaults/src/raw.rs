//! Raw vault - Plain sector image
//!
//! A raw sector image with no container metadata, served as a block device.
//! Common file extensions: .img, .ima, .dsk, .bin, .raw, .dd

use platter_core::{sectors_for, BlockDevice, Error, ReadSeek, ReadWriteSeek, Result, SECTOR_SIZE};
use platter_pipeline::MmapPipeline;
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Configuration for opening a vault
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Open without write access
    pub read_only: bool,
    /// Memory-map read-only images
    pub use_mmap: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            read_only: true,
            use_mmap: true,
        }
    }
}

enum Backing {
    Mapped(MmapPipeline),
    Stream(Box<dyn ReadSeek>),
    Writable(Box<dyn ReadWriteSeek>),
}

/// Raw vault - a sector window over a file, stream or memory buffer
///
/// # Example
///
/// ```rust,no_run
/// use platter_core::BlockDevice;
/// use platter_vaults::{RawVault, VaultConfig};
/// use std::path::Path;
///
/// let vault = RawVault::open(Path::new("disk.img"), VaultConfig::default()).unwrap();
/// println!("Vault type: {}", vault.identify());
/// println!("Size: {} bytes", vault.length());
/// ```
pub struct RawVault {
    backing: Backing,
    length: u64,
}

impl RawVault {
    /// Open a raw image file
    ///
    /// Read-only opens are memory-mapped when `config.use_mmap` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or mapped
    pub fn open(path: &Path, config: VaultConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(!config.read_only)
            .open(path)?;
        let length = file.metadata()?.len();

        let backing = match (config.read_only, config.use_mmap) {
            (true, true) => Backing::Mapped(MmapPipeline::from_file(&file)?),
            (true, false) => Backing::Stream(Box::new(file)),
            (false, _) => Backing::Writable(Box::new(file)),
        };

        tracing::debug!(path = %path.display(), length, read_only = config.read_only, "opened raw vault");
        Ok(Self { backing, length })
    }

    /// Wrap a readable, writable and seekable stream of `length` bytes
    pub fn from_stream<S: Read + Write + Seek + Send + 'static>(stream: S, length: u64) -> Self {
        Self {
            backing: Backing::Writable(Box::new(stream)),
            length,
        }
    }

    /// Wrap a read-only stream of `length` bytes
    pub fn from_reader<R: Read + Seek + Send + 'static>(reader: R, length: u64) -> Self {
        Self {
            backing: Backing::Stream(Box::new(reader)),
            length,
        }
    }

    /// Manufacture a new blank in-memory vault
    ///
    /// ```rust
    /// use platter_core::BlockDevice;
    /// use platter_vaults::RawVault;
    ///
    /// // A blank 1.44MB floppy image
    /// let vault = RawVault::manufacture(1_474_560);
    /// assert_eq!(vault.sector_count(), 2880);
    /// ```
    pub fn manufacture(size: u64) -> Self {
        let buffer = vec![0u8; size as usize];
        Self::from_stream(Cursor::new(buffer), size)
    }

    pub fn is_read_only(&self) -> bool {
        !matches!(self.backing, Backing::Writable(_))
    }

    fn byte_offset(&self, index: u64, len: usize) -> Result<u64> {
        let total = self.sector_count();
        let end = index.checked_add(sectors_for(len)).unwrap_or(u64::MAX);
        if index >= total || end > total {
            return Err(Error::bounds(i64::try_from(index).unwrap_or(i64::MAX), total));
        }
        Ok(index * SECTOR_SIZE as u64)
    }
}

impl BlockDevice for RawVault {
    fn identify(&self) -> &str {
        "Raw sector image"
    }

    fn read_sector(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        let offset = self.byte_offset(index, buf.len())?;
        match &mut self.backing {
            Backing::Mapped(mmap) => mmap.read_sector(index, buf),
            Backing::Stream(stream) => {
                stream.seek(SeekFrom::Start(offset))?;
                stream.read_exact(buf)?;
                Ok(())
            }
            Backing::Writable(stream) => {
                stream.seek(SeekFrom::Start(offset))?;
                stream.read_exact(buf)?;
                Ok(())
            }
        }
    }

    fn write_sector(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        let offset = self.byte_offset(index, buf.len())?;
        match &mut self.backing {
            Backing::Writable(stream) => {
                stream.seek(SeekFrom::Start(offset))?;
                stream.write_all(buf)?;
                Ok(())
            }
            _ => Err(Error::permission_denied("raw vault opened read-only")),
        }
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn flush(&mut self) -> Result<()> {
        if let Backing::Writable(stream) = &mut self.backing {
            stream.flush()?;
        }
        Ok(())
    }
}

/// Open a raw image straight from a file handle, without memory mapping
impl TryFrom<File> for RawVault {
    type Error = Error;

    fn try_from(file: File) -> Result<Self> {
        let length = file.metadata()?.len();
        Ok(Self::from_reader(file, length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn image(sectors: usize) -> Vec<u8> {
        (0..sectors * SECTOR_SIZE).map(|i| (i / SECTOR_SIZE) as u8).collect()
    }

    #[test]
    fn test_manufacture() {
        let mut vault = RawVault::manufacture(1024);
        assert_eq!(vault.identify(), "Raw sector image");
        assert_eq!(vault.length(), 1024);
        assert_eq!(vault.sector_count(), 2);
        assert!(!vault.is_read_only());

        vault.write_sector(1, &[0x77; 512]).unwrap();
        let mut buf = [0u8; 512];
        vault.read_sector(1, &mut buf).unwrap();
        assert_eq!(buf, [0x77; 512]);
    }

    #[test]
    fn test_from_reader_is_read_only() {
        let mut vault = RawVault::from_reader(Cursor::new(image(4)), 2048);
        let mut buf = [0u8; 1024];
        vault.read_sector(2, &mut buf).unwrap();
        assert!(buf[..512].iter().all(|&b| b == 2));
        assert!(buf[512..].iter().all(|&b| b == 3));
        assert!(matches!(vault.write_sector(0, &[0; 512]), Err(Error::PermissionDenied(_))));
    }

    #[test]
    fn test_bounds() {
        let mut vault = RawVault::manufacture(2048);
        let mut buf = [0u8; 512];
        assert!(matches!(vault.read_sector(4, &mut buf), Err(Error::Bounds { .. })));
        assert!(vault.read_sector(3, &mut [0u8; 1024]).is_err());
        assert!(vault.write_sector(u64::MAX, &buf).is_err());
    }

    #[test]
    fn test_open_mmap_and_stream() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&image(8)).unwrap();
        tmp.flush().unwrap();

        for use_mmap in [true, false] {
            let config = VaultConfig {
                read_only: true,
                use_mmap,
            };
            let mut vault = RawVault::open(tmp.path(), config).unwrap();
            assert_eq!(vault.sector_count(), 8);
            let mut buf = [0u8; 512];
            vault.read_sector(5, &mut buf).unwrap();
            assert_eq!(buf, [5; 512]);
            assert!(vault.write_sector(5, &buf).is_err());
        }
    }

    #[test]
    fn test_open_read_write_persists() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&image(4)).unwrap();
        tmp.flush().unwrap();

        let config = VaultConfig {
            read_only: false,
            use_mmap: true,
        };
        let mut vault = RawVault::open(tmp.path(), config).unwrap();
        vault.write_sector(0, &[0xC3; 512]).unwrap();
        vault.flush().unwrap();
        drop(vault);

        let on_disk = std::fs::read(tmp.path()).unwrap();
        assert!(on_disk[..512].iter().all(|&b| b == 0xC3));
        assert!(on_disk[512..1024].iter().all(|&b| b == 1));
    }

    #[test]
    fn test_try_from_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&image(2)).unwrap();
        let vault = RawVault::try_from(tmp.reopen().unwrap()).unwrap();
        assert_eq!(vault.length(), 1024);
        assert!(vault.is_read_only());
    }
}
