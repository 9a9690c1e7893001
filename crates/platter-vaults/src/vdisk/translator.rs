//! Logical sector to (extent, local sector) translation

use super::extent::ExtentDeclaration;
use platter_core::{sectors_for, Error, Result};

/// Maps virtual-disk sectors onto the extents that hold them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskAddressTranslator {
    sizes: Vec<u64>,
    total: u64,
}

impl DiskAddressTranslator {
    pub fn new(extents: &[ExtentDeclaration]) -> Result<Self> {
        let sizes: Vec<u64> = extents.iter().map(|e| e.size_in_sectors).collect();
        let total = sizes.iter().try_fold(0u64, |acc, &size| {
            acc.checked_add(size)
                .ok_or_else(|| Error::format("Extent sizes overflow 64 bits"))
        })?;
        Ok(Self { sizes, total })
    }

    pub fn total_sectors(&self) -> u64 {
        self.total
    }

    pub fn extent_count(&self) -> usize {
        self.sizes.len()
    }

    /// Extent index and sector within that extent
    ///
    /// Walks the extents in order; a sector outside `[0, total)` is a
    /// bounds error.
    pub fn translate(&self, sector: i64) -> Result<(usize, u64)> {
        let Ok(mut remaining) = u64::try_from(sector) else {
            return Err(Error::bounds(sector, self.total));
        };
        for (index, &size) in self.sizes.iter().enumerate() {
            if remaining < size {
                return Ok((index, remaining));
            }
            remaining -= size;
        }
        Err(Error::bounds(sector, self.total))
    }

    /// Check that a request of `buf_len` bytes starting at `sector` fits
    ///
    /// The request covers `ceil(buf_len / 512)` sectors; both its first and
    /// last sector must be addressable.
    pub fn check_bounds(&self, sector: i64, buf_len: usize) -> Result<()> {
        let requested = sectors_for(buf_len);
        if sector < 0 || sector as u64 >= self.total {
            return Err(Error::bounds(sector, self.total));
        }
        let last = (sector as u64).saturating_add(requested.saturating_sub(1));
        if last >= self.total {
            return Err(Error::bounds(i64::try_from(last).unwrap_or(i64::MAX), self.total));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdisk::extent::{Access, ExtentKind};

    fn translator(sizes: &[u64]) -> DiskAddressTranslator {
        let extents: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| ExtentDeclaration {
                access: Access::ReadWrite,
                size_in_sectors: size,
                kind: ExtentKind::Flat,
                file_name: Some(format!("disk-f{:03}.vmdk", i + 1)),
                offset: 0,
            })
            .collect();
        DiskAddressTranslator::new(&extents).unwrap()
    }

    #[test]
    fn test_two_extent_translation() {
        let t = translator(&[1000, 2000]);
        assert_eq!(t.total_sectors(), 3000);
        assert_eq!(t.translate(1500).unwrap(), (1, 500));
        assert_eq!(t.translate(999).unwrap(), (0, 999));
        assert_eq!(t.translate(1000).unwrap(), (1, 0));
        assert_eq!(t.translate(0).unwrap(), (0, 0));
        assert_eq!(t.translate(2999).unwrap(), (1, 1999));
    }

    #[test]
    fn test_out_of_range() {
        let t = translator(&[1000, 2000]);
        assert!(matches!(t.translate(-1), Err(Error::Bounds { sector: -1, total: 3000 })));
        assert!(matches!(t.translate(3000), Err(Error::Bounds { .. })));
        assert!(matches!(t.translate(i64::MIN), Err(Error::Bounds { .. })));
    }

    #[test]
    fn test_every_sector_maps_once() {
        let sizes = [3, 1, 4, 1, 5];
        let t = translator(&sizes);
        let mut counts = vec![0u64; sizes.len()];
        for s in 0..t.total_sectors() as i64 {
            let (index, local) = t.translate(s).unwrap();
            assert!(local < sizes[index]);
            assert_eq!(local, counts[index]);
            counts[index] += 1;
        }
        assert_eq!(counts, sizes);
    }

    #[test]
    fn test_empty_extent_is_skipped() {
        let t = translator(&[10, 0, 10]);
        assert_eq!(t.translate(10).unwrap(), (2, 0));
    }

    #[test]
    fn test_check_bounds() {
        let t = translator(&[1000, 2000]);
        assert!(t.check_bounds(0, 512).is_ok());
        assert!(t.check_bounds(2999, 512).is_ok());
        assert!(t.check_bounds(2998, 1024).is_ok());
        // Partial trailing sector still counts as a whole one
        assert!(t.check_bounds(2998, 1025).is_err());
        assert!(t.check_bounds(2999, 513).is_err());
        assert!(t.check_bounds(-1, 512).is_err());
        assert!(t.check_bounds(3000, 512).is_err());
        assert!(t.check_bounds(10, 0).is_ok());
    }
}
