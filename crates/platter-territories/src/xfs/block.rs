//! XFS block-form directories
//!
//! A single directory block holds a data header, the data entries, a leaf
//! array sorted by name hash and an 8-byte tail:
//!
//! ```text
//! +-------------------+  0
//! | header            |  16 bytes (XD2B) or 64 bytes (XDD3)
//! +-------------------+
//! | data / unused     |  8-byte aligned records
//! | ...               |
//! +-------------------+  block_size - 8 - count * 8
//! | leaf[0..count]    |  (hashval, address / 8)
//! +-------------------+  block_size - 8
//! | tail: count stale |
//! +-------------------+
//! ```
//!
//! All integers are big-endian.

use platter_core::{bytes, ByteCursor, DirectoryEntry, Error, Result};
use serde::Serialize;
use std::fmt;

/// Directory block magic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockMagic {
    /// "XD2B", v4 filesystems
    V2,
    /// "XDD3", v5 filesystems with self-describing metadata
    V3,
}

impl BlockMagic {
    pub const XD2B: u32 = 0x5844_3242;
    pub const XDD3: u32 = 0x5844_4433;

    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            Self::XD2B => Some(Self::V2),
            Self::XDD3 => Some(Self::V3),
            _ => None,
        }
    }

    pub fn value(&self) -> u32 {
        match self {
            Self::V2 => Self::XD2B,
            Self::V3 => Self::XDD3,
        }
    }

    /// Bytes before the first data entry
    pub fn header_len(&self) -> usize {
        match self {
            Self::V2 => 16,
            Self::V3 => 64,
        }
    }
}

impl fmt::Display for BlockMagic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V2 => f.write_str("XD2B"),
            Self::V3 => f.write_str("XDD3"),
        }
    }
}

/// One of the three largest free regions, tracked in the header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BestFree {
    pub offset: u16,
    pub length: u16,
}

/// Self-describing fields of a v3 header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dir3Info {
    pub crc: u32,
    pub blkno: u64,
    pub lsn: u64,
    pub uuid: [u8; 16],
    pub owner: u64,
}

/// Decoded data block header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataBlockHeader {
    pub magic: BlockMagic,
    pub best_free: [BestFree; 3],
    pub v3: Option<Dir3Info>,
}

impl DataBlockHeader {
    /// Decode and validate the header at the start of `block`
    ///
    /// # Errors
    ///
    /// `Format` when the magic is neither XD2B nor XDD3, `TruncatedData`
    /// when the block is shorter than the header.
    pub fn parse(block: &[u8]) -> Result<Self> {
        let raw = bytes::read_be_u32(block, 0)?;
        let magic = BlockMagic::from_raw(raw).ok_or_else(|| {
            Error::format(format!("Unknown directory block magic 0x{:08X}", raw))
        })?;
        bytes::read_bytes(block, 0, magic.header_len())?;

        let mut cursor = ByteCursor::new(block, 4);
        let v3 = match magic {
            BlockMagic::V2 => None,
            BlockMagic::V3 => Some(Dir3Info {
                crc: cursor.be_u32()?,
                blkno: cursor.be_u64()?,
                lsn: cursor.be_u64()?,
                uuid: bytes::read_array(cursor.bytes(16)?, 0)?,
                owner: cursor.be_u64()?,
            }),
        };

        let mut best_free = [BestFree::default(); 3];
        for slot in best_free.iter_mut() {
            slot.offset = cursor.be_u16()?;
            slot.length = cursor.be_u16()?;
        }

        Ok(Self {
            magic,
            best_free,
            v3,
        })
    }
}

/// Live data entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataEntry {
    pub inode: u64,
    pub name: Vec<u8>,
    pub file_type: Option<u8>,
    /// Offset of the entry, as stored at its end
    pub tag: u16,
    /// Byte offset in the block
    pub offset: usize,
    /// Padded length
    pub length: usize,
}

impl DataEntry {
    /// Marker in the first two bytes of an unused region
    pub const FREE_TAG: u16 = 0xFFFF;

    /// Padded size of an entry with a `name_len` byte name
    pub fn entry_length(name_len: usize, has_ftype: bool) -> usize {
        // inumber, namelen, name, [ftype], tag
        (8 + 1 + name_len + has_ftype as usize + 2 + 7) & !7
    }

    /// Decode the data entry at `offset`
    pub fn parse(block: &[u8], offset: usize, has_ftype: bool) -> Result<Self> {
        let mut cursor = ByteCursor::new(block, offset);
        let inode = cursor.be_u64()?;
        let name_len = cursor.u8()? as usize;
        if name_len == 0 {
            return Err(Error::format(format!("Directory entry at {} has an empty name", offset)));
        }
        let name = cursor.bytes(name_len)?.to_vec();
        let file_type = if has_ftype { Some(cursor.u8()?) } else { None };

        let length = Self::entry_length(name_len, has_ftype);
        let tag = bytes::read_be_u16(block, offset + length - 2)?;
        if tag as usize != offset {
            tracing::debug!(offset, tag, "directory entry tag does not match its offset");
        }

        Ok(Self {
            inode,
            name,
            file_type,
            tag,
            offset,
            length,
        })
    }

    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    pub fn to_entry(&self) -> DirectoryEntry {
        DirectoryEntry {
            inode: self.inode,
            name: self.name_lossy(),
            record_length: self.length,
            tag_or_offset: self.tag as u64,
            file_type: self.file_type,
        }
    }
}

/// Block tail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockTail {
    /// Leaf entries, stale ones included
    pub count: u32,
    pub stale: u32,
}

impl BlockTail {
    pub const LEN: usize = 8;
}

/// Leaf entry: name hash and entry address in 8-byte units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeafEntry {
    pub hashval: u32,
    pub address: u32,
}

impl LeafEntry {
    pub const LEN: usize = 8;

    /// Byte offset of the data entry, `None` for a stale leaf
    pub fn byte_offset(&self) -> Option<usize> {
        (self.address != 0).then(|| self.address as usize * 8)
    }
}

/// Decoded directory block
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryBlock {
    pub header: DataBlockHeader,
    pub tail: BlockTail,
    pub leaf: Vec<LeafEntry>,
    /// Data entries in block order
    pub data: Vec<DataEntry>,
}

impl DirectoryBlock {
    /// Decode a whole directory block
    ///
    /// v3 blocks always carry the file-type byte; for v2 blocks it depends
    /// on the filesystem feature passed as `has_ftype`.
    pub fn parse(block: &[u8], has_ftype: bool) -> Result<Self> {
        let header = DataBlockHeader::parse(block)?;
        let has_ftype = has_ftype || header.magic == BlockMagic::V3;
        let header_len = header.magic.header_len();

        let tail_offset = block
            .len()
            .checked_sub(BlockTail::LEN)
            .filter(|&off| off >= header_len)
            .ok_or_else(|| Error::truncated(header_len + BlockTail::LEN, 0, block.len()))?;
        let tail = BlockTail {
            count: bytes::read_be_u32(block, tail_offset)?,
            stale: bytes::read_be_u32(block, tail_offset + 4)?,
        };

        let leaf_bytes = (tail.count as usize).saturating_mul(LeafEntry::LEN);
        let leaf_start = tail_offset
            .checked_sub(leaf_bytes)
            .filter(|&start| start >= header_len)
            .ok_or_else(|| Error::truncated(header_len + leaf_bytes + BlockTail::LEN, 0, block.len()))?;

        let count = tail.count as usize;
        let leaf = (0..count)
            .map(|i| -> Result<LeafEntry> {
                let at = block.len() - (count - i) * LeafEntry::LEN - BlockTail::LEN;
                Ok(LeafEntry {
                    hashval: bytes::read_be_u32(block, at)?,
                    address: bytes::read_be_u32(block, at + 4)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let data = Self::walk_data(&block[..leaf_start], header_len, has_ftype)?;

        tracing::trace!(
            magic = %header.magic,
            entries = data.len(),
            leaf = leaf.len(),
            stale = tail.stale,
            "parsed directory block"
        );

        Ok(Self {
            header,
            tail,
            leaf,
            data,
        })
    }

    fn walk_data(area: &[u8], start: usize, has_ftype: bool) -> Result<Vec<DataEntry>> {
        let mut entries = Vec::new();
        let mut offset = start;
        while offset < area.len() {
            if bytes::read_be_u16(area, offset)? == DataEntry::FREE_TAG {
                let len = bytes::read_be_u16(area, offset + 2)? as usize;
                if len < 8 || len % 8 != 0 {
                    return Err(Error::format(format!(
                        "Unused directory region at {} has invalid length {}",
                        offset, len
                    )));
                }
                offset += len;
                continue;
            }
            let entry = DataEntry::parse(area, offset, has_ftype)?;
            offset += entry.length;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Live leaf entries (total minus stale)
    pub fn live_count(&self) -> usize {
        self.leaf.iter().filter(|l| l.address != 0).count()
    }

    /// Data entry addressed by leaf `index`, `None` for a stale leaf
    pub fn leaf_entry(&self, index: usize) -> Result<Option<&DataEntry>> {
        let leaf = self.leaf.get(index).ok_or_else(|| {
            Error::not_found(format!("leaf {} of {}", index, self.leaf.len()))
        })?;
        let Some(offset) = leaf.byte_offset() else {
            return Ok(None);
        };
        self.data
            .iter()
            .find(|e| e.offset == offset)
            .map(Some)
            .ok_or_else(|| Error::format(format!("Leaf {} points at {} where no entry starts", index, offset)))
    }

    /// Entries in leaf (hash) order, stale leaves skipped
    pub fn entries(&self) -> Result<Vec<&DataEntry>> {
        let mut out = Vec::with_capacity(self.leaf.len());
        for index in 0..self.leaf.len() {
            if let Some(entry) = self.leaf_entry(index)? {
                out.push(entry);
            }
        }
        Ok(out)
    }

    pub fn directory_entries(&self) -> Result<Vec<DirectoryEntry>> {
        Ok(self.entries()?.into_iter().map(DataEntry::to_entry).collect())
    }

    /// Find an entry by name through the hash-sorted leaf
    pub fn lookup(&self, name: &[u8]) -> Result<Option<&DataEntry>> {
        let hash = da_hashname(name);
        let first = self.leaf.partition_point(|l| l.hashval < hash);
        for index in first..self.leaf.len() {
            if self.leaf[index].hashval != hash {
                break;
            }
            if let Some(entry) = self.leaf_entry(index)? {
                if entry.name == name {
                    return Ok(Some(entry));
                }
            }
        }
        Ok(None)
    }
}

/// Directory name hash used to order leaf entries
pub fn da_hashname(name: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    let mut chunks = name.chunks_exact(4);
    for c in &mut chunks {
        hash = ((c[0] as u32) << 21)
            ^ ((c[1] as u32) << 14)
            ^ ((c[2] as u32) << 7)
            ^ (c[3] as u32)
            ^ hash.rotate_left(7 * 4);
    }
    match chunks.remainder() {
        [a, b, c] => ((*a as u32) << 14) ^ ((*b as u32) << 7) ^ (*c as u32) ^ hash.rotate_left(7 * 3),
        [a, b] => ((*a as u32) << 7) ^ (*b as u32) ^ hash.rotate_left(7 * 2),
        [a] => (*a as u32) ^ hash.rotate_left(7),
        _ => hash,
    }
}

/// Parse several directory blocks independently
///
/// A bad block yields its own error and does not stop the others.
pub fn parse_directory_blocks<'a, I>(blocks: I, has_ftype: bool) -> Vec<Result<DirectoryBlock>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    blocks
        .into_iter()
        .enumerate()
        .map(|(index, block)| {
            DirectoryBlock::parse(block, has_ftype).map_err(|e| {
                tracing::warn!(block = index, error = %e, "directory block unreadable");
                e
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a block with the given entries, leaf sorted by hash
    pub(crate) fn build_block(magic: BlockMagic, size: usize, names: &[(&str, u64)], has_ftype: bool) -> Vec<u8> {
        let has_ftype = has_ftype || magic == BlockMagic::V3;
        let mut block = vec![0u8; size];
        block[0..4].copy_from_slice(&magic.value().to_be_bytes());

        let mut offset = magic.header_len();
        let mut leaf = Vec::new();
        for (name, inode) in names {
            let len = DataEntry::entry_length(name.len(), has_ftype);
            block[offset..offset + 8].copy_from_slice(&inode.to_be_bytes());
            block[offset + 8] = name.len() as u8;
            block[offset + 9..offset + 9 + name.len()].copy_from_slice(name.as_bytes());
            if has_ftype {
                block[offset + 9 + name.len()] = 1;
            }
            block[offset + len - 2..offset + len].copy_from_slice(&(offset as u16).to_be_bytes());
            leaf.push((da_hashname(name.as_bytes()), (offset / 8) as u32));
            offset += len;
        }
        leaf.sort();

        let tail = size - BlockTail::LEN;
        let leaf_start = tail - leaf.len() * LeafEntry::LEN;
        // Free space between entries and leaf
        if leaf_start > offset {
            block[offset..offset + 2].copy_from_slice(&DataEntry::FREE_TAG.to_be_bytes());
            block[offset + 2..offset + 4].copy_from_slice(&((leaf_start - offset) as u16).to_be_bytes());
        }
        for (i, (hash, addr)) in leaf.iter().enumerate() {
            let at = leaf_start + i * 8;
            block[at..at + 4].copy_from_slice(&hash.to_be_bytes());
            block[at + 4..at + 8].copy_from_slice(&addr.to_be_bytes());
        }
        block[tail..tail + 4].copy_from_slice(&(leaf.len() as u32).to_be_bytes());
        block
    }

    #[test]
    fn test_bad_magic_yields_no_entries() {
        let mut block = build_block(BlockMagic::V2, 4096, &[("a", 1)], false);
        block[0..4].copy_from_slice(b"XD2D");
        assert!(matches!(DirectoryBlock::parse(&block, false), Err(Error::Format(_))));
        assert!(matches!(DataBlockHeader::parse(&[0u8; 64]), Err(Error::Format(_))));
    }

    #[test]
    fn test_v2_block() {
        let names = [(".", 128), ("..", 128), ("passwd", 131), ("hosts", 132)];
        let block = build_block(BlockMagic::V2, 4096, &names, false);
        let dir = DirectoryBlock::parse(&block, false).unwrap();

        assert_eq!(dir.header.magic, BlockMagic::V2);
        assert!(dir.header.v3.is_none());
        assert_eq!(dir.tail.count, 4);
        assert_eq!(dir.data.len(), 4);
        assert_eq!(dir.data[0].offset, 16);
        assert_eq!(dir.data[0].length, 16);
        assert_eq!(dir.data[2].tag as usize, dir.data[2].offset);

        let entries = dir.entries().unwrap();
        assert_eq!(entries.len(), 4);
        let hashes: Vec<_> = entries.iter().map(|e| da_hashname(&e.name)).collect();
        assert!(hashes.windows(2).all(|w| w[0] <= w[1]));

        assert_eq!(dir.lookup(b"hosts").unwrap().map(|e| e.inode), Some(132));
        assert!(dir.lookup(b"shadow").unwrap().is_none());
    }

    #[test]
    fn test_v3_block_carries_ftype() {
        let block = build_block(BlockMagic::V3, 4096, &[("kernel", 77)], false);
        let dir = DirectoryBlock::parse(&block, false).unwrap();

        assert_eq!(dir.header.magic, BlockMagic::V3);
        assert!(dir.header.v3.is_some());
        assert_eq!(dir.data[0].offset, 64);
        assert_eq!(dir.data[0].file_type, Some(1));
        assert_eq!(dir.data[0].length, DataEntry::entry_length(6, true));

        let entries = dir.directory_entries().unwrap();
        assert_eq!(entries[0].name, "kernel");
        assert_eq!(entries[0].tag_or_offset, 64);
    }

    #[test]
    fn test_leaf_positions_follow_trailer_layout() {
        let block = build_block(BlockMagic::V2, 1024, &[("a", 1), ("b", 2), ("c", 3)], false);
        let dir = DirectoryBlock::parse(&block, false).unwrap();
        for (i, leaf) in dir.leaf.iter().enumerate() {
            let at = 1024 - (3 - i) * 8 - 8;
            assert_eq!(leaf.hashval, u32::from_be_bytes(block[at..at + 4].try_into().unwrap()));
            let entry = dir.leaf_entry(i).unwrap().unwrap();
            assert_eq!(Some(entry.offset), leaf.byte_offset());
        }
    }

    #[test]
    fn test_stale_leaf_skipped() {
        let mut block = build_block(BlockMagic::V2, 1024, &[("a", 1), ("b", 2)], false);
        let first_leaf = 1024 - 8 - 2 * 8;
        block[first_leaf + 4..first_leaf + 8].copy_from_slice(&0u32.to_be_bytes());

        let dir = DirectoryBlock::parse(&block, false).unwrap();
        assert_eq!(dir.live_count(), 1);
        assert_eq!(dir.entries().unwrap().len(), 1);
        assert_eq!(dir.leaf_entry(0).unwrap(), None);
    }

    #[test]
    fn test_leaf_count_past_block() {
        let mut block = build_block(BlockMagic::V2, 512, &[("a", 1)], false);
        block[504..508].copy_from_slice(&1000u32.to_be_bytes());
        assert!(matches!(
            DirectoryBlock::parse(&block, false),
            Err(Error::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_short_block() {
        assert!(matches!(
            DirectoryBlock::parse(&0x5844_3242u32.to_be_bytes(), false),
            Err(Error::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_blocks_fail_independently() {
        let good = build_block(BlockMagic::V2, 512, &[("x", 9)], false);
        let mut bad = good.clone();
        bad[0] = 0;
        let mut image = good.clone();
        image.extend_from_slice(&bad);
        image.extend_from_slice(&good);

        let results = parse_directory_blocks(image.chunks(512), false);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Format(_))));
        assert_eq!(results[2].as_ref().unwrap().data[0].inode, 9);
    }

    #[test]
    fn test_hashname_is_order_sensitive() {
        assert_ne!(da_hashname(b"ab"), da_hashname(b"ba"));
        assert_eq!(da_hashname(b""), 0);
        assert_eq!(da_hashname(b"a"), b'a' as u32);
    }
}
