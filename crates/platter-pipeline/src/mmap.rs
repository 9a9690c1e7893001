//! Memory-mapped pipeline for read-only images

use memmap2::Mmap;
use platter_core::{sectors_for, BlockDevice, Error, Result, MAX_MMAP_SIZE, SECTOR_SIZE};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A read-only pipeline backed by a memory-mapped file
///
/// Implements both `Read + Seek` (for stream consumers) and [`BlockDevice`]
/// (for sector consumers). Writes through the block interface are rejected.
///
/// # Example
///
/// ```rust,no_run
/// use platter_pipeline::MmapPipeline;
/// use std::path::Path;
///
/// let pipeline = MmapPipeline::open(Path::new("disk.img")).unwrap();
/// println!("{} bytes mapped", pipeline.len());
/// ```
pub struct MmapPipeline {
    mmap: Mmap,
    position: u64,
}

impl MmapPipeline {
    /// Open and map a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is not a regular file,
    /// or is larger than [`MAX_MMAP_SIZE`].
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(&file)
    }

    /// Map an already opened file
    pub fn from_file(file: &File) -> io::Result<Self> {
        let metadata = file.metadata()?;

        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Only regular files can be memory-mapped",
            ));
        }

        if metadata.len() > MAX_MMAP_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "File size {} exceeds memory mapping limit {}",
                    metadata.len(),
                    MAX_MMAP_SIZE
                ),
            ));
        }

        // SAFETY: the descriptor is valid and refers to a regular file of
        // bounded size. The mapping is read-only; the file must not be
        // truncated while mapped (caller responsibility).
        let mmap = unsafe { Mmap::map(file)? };
        tracing::debug!(len = mmap.len(), "mapped image");

        Ok(Self { mmap, position: 0 })
    }

    /// Length of the mapped region
    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Is the mapped region empty?
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Current stream position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left from the current position
    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position)
    }

    /// The whole mapped image
    pub fn as_full_slice(&self) -> &[u8] {
        &self.mmap
    }
}

impl Read for MmapPipeline {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining() as usize;
        if remaining == 0 {
            return Ok(0);
        }

        let to_read = buf.len().min(remaining);
        let start = self.position as usize;
        buf[..to_read].copy_from_slice(&self.mmap[start..start + to_read]);
        self.position += to_read as u64;

        Ok(to_read)
    }
}

impl Seek for MmapPipeline {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.len() as i64 + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };

        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Seek before beginning of file",
            ));
        }

        // Seeking past EOF is allowed; reads there return 0
        self.position = new_pos as u64;
        Ok(self.position)
    }
}

impl BlockDevice for MmapPipeline {
    fn identify(&self) -> &str {
        "Memory-mapped image"
    }

    fn read_sector(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        let total = self.sector_count();
        let count = sectors_for(buf.len());
        let end = index.checked_add(count).unwrap_or(u64::MAX);
        if end > total {
            return Err(Error::bounds(index.min(i64::MAX as u64) as i64, total));
        }

        let start = index as usize * SECTOR_SIZE;
        buf.copy_from_slice(&self.mmap[start..start + buf.len()]);
        Ok(())
    }

    fn write_sector(&mut self, _index: u64, _buf: &[u8]) -> Result<()> {
        Err(Error::permission_denied("memory-mapped images are read-only"))
    }

    fn length(&self) -> u64 {
        self.len()
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
