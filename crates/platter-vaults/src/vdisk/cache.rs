//! Lazily opened extent handles

use super::extent::ExtentDeclaration;
use super::io::ExtentHandle;
use platter_core::{Error, Result};
use std::path::{Path, PathBuf};

/// One slot per extent, indexed by the extent's position in the descriptor
#[derive(Debug)]
pub struct ExtentCache {
    base_dir: PathBuf,
    read_only: bool,
    handles: Vec<Option<ExtentHandle>>,
}

impl ExtentCache {
    pub fn new(base_dir: &Path, extent_count: usize, read_only: bool) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            read_only,
            handles: (0..extent_count).map(|_| None).collect(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of handles currently open
    pub fn open_count(&self) -> usize {
        self.handles.iter().filter(|h| h.is_some()).count()
    }

    /// Handle for extent `index`, opening its backing file on first use
    pub fn get_handle(&mut self, index: usize, extent: &ExtentDeclaration) -> Result<&mut ExtentHandle> {
        let slots = self.handles.len();
        let slot = self.handles.get_mut(index).ok_or_else(|| {
            Error::invalid_operation(format!("extent {} of {} has no cache slot", index, slots))
        })?;

        if slot.is_none() {
            let writable = !self.read_only && extent.access.can_write();
            *slot = Some(ExtentHandle::open(extent, &self.base_dir, writable)?);
        }

        slot.as_mut()
            .ok_or_else(|| Error::invalid_operation("extent handle vanished"))
    }

    /// Flush and close every open handle
    ///
    /// All handles are closed even when one fails; the first error is returned.
    pub fn flush(&mut self) -> Result<()> {
        let mut first_error = None;
        for (index, slot) in self.handles.iter_mut().enumerate() {
            if let Some(mut handle) = slot.take() {
                if let Err(e) = handle.flush() {
                    tracing::warn!(extent = index, error = %e, "extent flush failed");
                    first_error.get_or_insert(e);
                }
                tracing::debug!(extent = index, "closed extent handle");
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdisk::extent::{Access, ExtentKind};
    use tempfile::TempDir;

    fn flat(name: &str) -> ExtentDeclaration {
        ExtentDeclaration {
            access: Access::ReadWrite,
            size_in_sectors: 2,
            kind: ExtentKind::Flat,
            file_name: Some(name.to_string()),
            offset: 0,
        }
    }

    #[test]
    fn test_lazy_open_and_flush_closes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.img"), vec![0u8; 1024]).unwrap();
        std::fs::write(dir.path().join("b.img"), vec![0u8; 1024]).unwrap();
        let extents = [flat("a.img"), flat("b.img")];

        let mut cache = ExtentCache::new(dir.path(), extents.len(), false);
        assert_eq!(cache.open_count(), 0);

        cache.get_handle(1, &extents[1]).unwrap();
        cache.get_handle(1, &extents[1]).unwrap();
        assert_eq!(cache.open_count(), 1);

        cache.get_handle(0, &extents[0]).unwrap();
        assert_eq!(cache.open_count(), 2);

        cache.flush().unwrap();
        assert_eq!(cache.open_count(), 0);
    }

    #[test]
    fn test_read_only_cache_opens_read_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.img"), vec![0u8; 1024]).unwrap();
        let extent = flat("a.img");

        let mut cache = ExtentCache::new(dir.path(), 1, true);
        let handle = cache.get_handle(0, &extent).unwrap();
        assert!(matches!(
            handle.write_sector(0, &[0; 512]),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_failed_open_leaves_slot_empty() {
        let dir = TempDir::new().unwrap();
        let mut cache = ExtentCache::new(dir.path(), 1, false);
        assert!(cache.get_handle(0, &flat("missing.img")).is_err());
        assert_eq!(cache.open_count(), 0);
        assert!(cache.get_handle(3, &flat("missing.img")).is_err());
    }
}
