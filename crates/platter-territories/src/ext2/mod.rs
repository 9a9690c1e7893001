//! ext2/ext4 linear directory blocks
//!
//! A directory block is a chain of records whose lengths add up to the
//! block size. Deleted records keep their length (inode 0) so the chain
//! stays intact. ext4 with metadata checksums ends the block with a
//! 12-byte checksum tail.

pub mod types;

pub use types::{ChecksumTail, Ext2DirectoryRecord, Ext2FileType};

use platter_core::{DirectoryEntry, Result};

/// Decoded directory block
#[derive(Debug, Clone, Default)]
pub struct Ext2DirectoryBlock {
    /// Live records in block order
    pub records: Vec<Ext2DirectoryRecord>,
    pub tail: Option<ChecksumTail>,
}

impl Ext2DirectoryBlock {
    /// Walk every record of `block`
    ///
    /// Deleted records are skipped. The walk stops at a checksum tail.
    pub fn parse(block: &[u8]) -> Result<Self> {
        let mut records = Vec::new();
        let mut tail = None;
        let mut offset = 0;

        while offset + Ext2DirectoryRecord::HEADER_LEN <= block.len() {
            if offset + ChecksumTail::LEN == block.len() {
                if let Some(found) = ChecksumTail::parse(block, offset)? {
                    tail = Some(found);
                    break;
                }
            }

            let record = Ext2DirectoryRecord::parse(block, offset)?;
            offset += record.rec_len as usize;

            if record.is_unused() {
                tracing::trace!(offset = record.offset, "skipping deleted directory record");
                continue;
            }
            records.push(record);
        }

        Ok(Self { records, tail })
    }

    /// Records as generic directory entries
    pub fn entries(&self) -> Vec<DirectoryEntry> {
        self.records.iter().map(Ext2DirectoryRecord::to_entry).collect()
    }

    pub fn find(&self, name: &[u8]) -> Option<&Ext2DirectoryRecord> {
        self.records.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platter_core::Error;

    /// Lay out records in a block, stretching the last one to the end
    fn build_block(size: usize, records: &[(u32, &str, Ext2FileType)], with_tail: bool) -> Vec<u8> {
        let mut block = vec![0u8; size];
        let end = if with_tail { size - ChecksumTail::LEN } else { size };
        let mut offset = 0;
        for (i, (inode, name, kind)) in records.iter().enumerate() {
            let mut record = Ext2DirectoryRecord::new(*inode, name.as_bytes(), *kind).unwrap();
            if i + 1 == records.len() {
                record.rec_len = (end - offset) as u16;
            }
            let raw = record.to_bytes().unwrap();
            block[offset..offset + raw.len()].copy_from_slice(&raw);
            offset += raw.len();
        }
        if with_tail {
            block[end..].copy_from_slice(&ChecksumTail { checksum: 0x1234_5678 }.to_bytes());
        }
        block
    }

    #[test]
    fn test_parse_block() {
        let block = build_block(
            1024,
            &[
                (2, ".", Ext2FileType::Directory),
                (2, "..", Ext2FileType::Directory),
                (11, "lost+found", Ext2FileType::Directory),
                (12, "notes.txt", Ext2FileType::Regular),
            ],
            false,
        );
        let dir = Ext2DirectoryBlock::parse(&block).unwrap();

        assert!(dir.tail.is_none());
        assert_eq!(dir.records.len(), 4);
        assert_eq!(dir.records[2].offset, 24);
        assert_eq!(dir.records[3].rec_len as usize, 1024 - 44);
        assert_eq!(dir.find(b"notes.txt").map(|r| r.inode), Some(12));

        let entries = dir.entries();
        assert_eq!(entries[3].name, "notes.txt");
        assert_eq!(entries[3].tag_or_offset, 44);
    }

    #[test]
    fn test_deleted_records_are_skipped() {
        let mut block = build_block(
            512,
            &[
                (2, ".", Ext2FileType::Directory),
                (7, "gone", Ext2FileType::Regular),
                (8, "kept", Ext2FileType::Regular),
            ],
            false,
        );
        block[12..16].copy_from_slice(&0u32.to_le_bytes());

        let dir = Ext2DirectoryBlock::parse(&block).unwrap();
        let names: Vec<_> = dir.records.iter().map(|r| r.name_lossy()).collect();
        assert_eq!(names, vec![".", "kept"]);
    }

    #[test]
    fn test_checksum_tail_ends_walk() {
        let block = build_block(
            1024,
            &[(2, ".", Ext2FileType::Directory), (2, "..", Ext2FileType::Directory)],
            true,
        );
        let dir = Ext2DirectoryBlock::parse(&block).unwrap();
        assert_eq!(dir.records.len(), 2);
        assert_eq!(dir.tail.map(|t| t.checksum), Some(0x1234_5678));
    }

    #[test]
    fn test_overlong_record_is_truncation() {
        let mut block = build_block(256, &[(2, ".", Ext2FileType::Directory)], false);
        block[4..6].copy_from_slice(&512u16.to_le_bytes());
        assert!(matches!(
            Ext2DirectoryBlock::parse(&block),
            Err(Error::TruncatedData { .. })
        ));
    }
}
