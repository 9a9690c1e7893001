//! Per-extent sector I/O

use super::extent::{ExtentDeclaration, ExtentKind};
use super::sparse::SparseExtentIo;
use platter_core::{checked_multiply_u64, Error, Result, SECTOR_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Flat extent: sectors stored back to back from `offset`
#[derive(Debug)]
pub struct FlatExtentIo {
    file: File,
    offset: u64,
    writable: bool,
}

impl FlatExtentIo {
    pub fn new(file: File, offset: u64, writable: bool) -> Self {
        Self {
            file,
            offset,
            writable,
        }
    }

    fn seek_to(&mut self, local: u64) -> Result<()> {
        let sector = self
            .offset
            .checked_add(local)
            .ok_or_else(|| Error::format("Flat extent offset overflows"))?;
        let pos = checked_multiply_u64(sector, SECTOR_SIZE as u64, "flat extent")?;
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn read_sector(&mut self, local: u64, buf: &mut [u8]) -> Result<()> {
        self.seek_to(local)?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    pub fn write_sector(&mut self, local: u64, buf: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(Error::permission_denied("flat extent opened read-only"));
        }
        self.seek_to(local)?;
        self.file.write_all(buf)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.writable {
            self.file.flush()?;
            self.file.sync_data()?;
        }
        Ok(())
    }
}

/// Open I/O strategy for one extent
#[derive(Debug)]
pub enum ExtentHandle {
    Flat(FlatExtentIo),
    Sparse(SparseExtentIo),
    /// Reads as zeros, has no backing file
    Zero,
}

impl ExtentHandle {
    /// Open the backing file of `extent` and pick the strategy for its kind
    ///
    /// `FLAT` and `VMFS` share the flat layout. `VMFSSPARSE`, `VMFSRDM` and
    /// `VMFSRAW` are unsupported.
    pub fn open(extent: &ExtentDeclaration, base_dir: &Path, writable: bool) -> Result<Self> {
        extent.kind.check_supported()?;
        match extent.kind {
            ExtentKind::Zero => Ok(Self::Zero),
            ExtentKind::Flat | ExtentKind::Vmfs => {
                let file = open_backing(extent, base_dir, writable)?;
                Ok(Self::Flat(FlatExtentIo::new(file, extent.offset, writable)))
            }
            ExtentKind::Sparse => {
                let file = open_backing(extent, base_dir, writable)?;
                let io = SparseExtentIo::new(file, writable)?;
                if io.header().capacity < extent.size_in_sectors {
                    return Err(Error::format(format!(
                        "Sparse extent holds {} sectors but the descriptor declares {}",
                        io.header().capacity,
                        extent.size_in_sectors
                    )));
                }
                Ok(Self::Sparse(io))
            }
            ExtentKind::VmfsSparse | ExtentKind::VmfsRdm | ExtentKind::VmfsRaw => {
                Err(Error::unsupported(format!("{} extents are not supported", extent.kind)))
            }
        }
    }

    pub fn read_sector(&mut self, local: u64, buf: &mut [u8]) -> Result<()> {
        match self {
            Self::Flat(io) => io.read_sector(local, buf),
            Self::Sparse(io) => io.read_sector(local, buf),
            Self::Zero => {
                buf.fill(0);
                Ok(())
            }
        }
    }

    pub fn write_sector(&mut self, local: u64, buf: &[u8]) -> Result<()> {
        match self {
            Self::Flat(io) => io.write_sector(local, buf),
            Self::Sparse(io) => io.write_sector(local, buf),
            Self::Zero => Err(Error::permission_denied("ZERO extents cannot be written")),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        match self {
            Self::Flat(io) => io.flush(),
            Self::Sparse(io) => io.flush(),
            Self::Zero => Ok(()),
        }
    }
}

fn open_backing(extent: &ExtentDeclaration, base_dir: &Path, writable: bool) -> Result<File> {
    let path = extent
        .resolve(base_dir)
        .ok_or_else(|| Error::format(format!("{} extent without a file name", extent.kind)))?;

    let file = OpenOptions::new()
        .read(true)
        .write(writable)
        .open(&path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::not_found(format!("extent file {}", path.display())),
            _ => Error::Io(e),
        })?;

    tracing::debug!(path = %path.display(), kind = %extent.kind, writable, "opened extent file");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdisk::extent::Access;
    use tempfile::TempDir;

    fn decl(kind: ExtentKind, name: Option<&str>, size: u64, offset: u64) -> ExtentDeclaration {
        ExtentDeclaration {
            access: Access::ReadWrite,
            size_in_sectors: size,
            kind,
            file_name: name.map(String::from),
            offset,
        }
    }

    #[test]
    fn test_flat_with_offset() {
        let dir = TempDir::new().unwrap();
        let mut data = vec![0u8; 8 * 512];
        data[5 * 512..6 * 512].fill(0x5A);
        std::fs::write(dir.path().join("flat.img"), &data).unwrap();

        let ext = decl(ExtentKind::Flat, Some("flat.img"), 4, 4);
        let mut handle = ExtentHandle::open(&ext, dir.path(), true).unwrap();

        let mut buf = [0u8; 512];
        handle.read_sector(1, &mut buf).unwrap();
        assert_eq!(buf, [0x5A; 512]);

        handle.write_sector(2, &[0x11; 512]).unwrap();
        handle.flush().unwrap();
        let on_disk = std::fs::read(dir.path().join("flat.img")).unwrap();
        assert!(on_disk[6 * 512..7 * 512].iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_zero_extent() {
        let ext = decl(ExtentKind::Zero, None, 100, 0);
        let mut handle = ExtentHandle::open(&ext, Path::new("."), true).unwrap();

        let mut buf = [0xFFu8; 512];
        handle.read_sector(50, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
        assert!(matches!(
            handle.write_sector(0, &buf),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let ext = decl(ExtentKind::Flat, Some("absent.img"), 4, 0);
        assert!(matches!(
            ExtentHandle::open(&ext, dir.path(), false),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_unsupported_kinds() {
        for kind in [ExtentKind::VmfsSparse, ExtentKind::VmfsRdm, ExtentKind::VmfsRaw] {
            let ext = decl(kind, Some("x"), 4, 0);
            assert!(matches!(
                ExtentHandle::open(&ext, Path::new("."), false),
                Err(Error::UnsupportedVariant(_))
            ));
        }
    }

    #[test]
    fn test_read_only_flat_rejects_write() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ro.img"), vec![0u8; 1024]).unwrap();
        let ext = decl(ExtentKind::Flat, Some("ro.img"), 2, 0);
        let mut handle = ExtentHandle::open(&ext, dir.path(), false).unwrap();
        assert!(matches!(
            handle.write_sector(0, &[0; 512]),
            Err(Error::PermissionDenied(_))
        ));
    }
}
