//! Partial device - a sector window into a parent block device

use platter_core::{sectors_for, BlockDevice, Error, PartitionTableEntry, Result, SECTOR_SIZE};

/// A block device that exposes only a range of a parent's sectors
///
/// This presents a partition as an independent device without copying data.
/// Sector 0 of the window is `start` on the parent.
///
/// # Example
///
/// ```rust
/// use platter_core::BlockDevice;
/// use platter_pipeline::PartialDevice;
/// # fn demo(disk: impl BlockDevice) -> platter_core::Result<()> {
/// let mut partition = PartialDevice::new(disk, 2048, 1024)?;
/// assert_eq!(partition.sector_count(), 1024);
/// # Ok(())
/// # }
/// ```
pub struct PartialDevice<D: BlockDevice> {
    inner: D,
    start: u64,
    count: u64,
    label: String,
}

impl<D: BlockDevice> PartialDevice<D> {
    /// Create a window of `count` sectors starting at `start`
    ///
    /// # Errors
    ///
    /// Returns a bounds error if the window does not fit on the parent.
    pub fn new(inner: D, start: u64, count: u64) -> Result<Self> {
        let total = inner.sector_count();
        let fits = start.checked_add(count).map_or(false, |end| end <= total);
        if !fits {
            return Err(Error::bounds(
                start.saturating_add(count).min(i64::MAX as u64) as i64,
                total,
            ));
        }

        let label = format!("{} [sectors {}+{}]", inner.identify(), start, count);
        Ok(Self {
            inner,
            start,
            count,
            label,
        })
    }

    /// Create a window covering one partition table entry
    pub fn for_entry(inner: D, entry: &PartitionTableEntry) -> Result<Self> {
        Self::new(inner, entry.start_sector, entry.sector_count)
    }

    /// First parent sector of the window
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Give back the parent device
    pub fn into_inner(self) -> D {
        self.inner
    }

    fn check_range(&self, index: u64, len: usize) -> Result<u64> {
        let end = index.checked_add(sectors_for(len)).unwrap_or(u64::MAX);
        if end > self.count {
            return Err(Error::bounds(index.min(i64::MAX as u64) as i64, self.count));
        }
        Ok(self.start + index)
    }
}

impl<D: BlockDevice> BlockDevice for PartialDevice<D> {
    fn identify(&self) -> &str {
        &self.label
    }

    fn read_sector(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        let parent = self.check_range(index, buf.len())?;
        self.inner.read_sector(parent, buf)
    }

    fn write_sector(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        let parent = self.check_range(index, buf.len())?;
        self.inner.write_sector(parent, buf)
    }

    fn length(&self) -> u64 {
        self.count * SECTOR_SIZE as u64
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
