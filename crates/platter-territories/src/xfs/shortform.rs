//! XFS short-form directories
//!
//! Small directories live inside the inode's data fork:
//!
//! ```text
//! Header:
//! 0   1     count    number of entries
//! 1   1     i8count  entries needing 64-bit inode numbers (0 = all 32-bit)
//! 2   4|8   parent   inode number of ".."
//!
//! Entry:
//! 0   1     namelen
//! 1   2     offset   tag used for readdir cookies
//! 3   n     name
//! ..  0|1   ftype    only with the file-type feature
//! ..  4|8   inumber
//! ```
//!
//! Integers are big-endian. The inode width is a property of the whole
//! directory, chosen by `i8count`.

use platter_core::{bytes, DirectoryEntry, Error, Result};
use serde::Serialize;

/// Width of inode numbers in a short-form directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InodeWidth {
    Four,
    Eight,
}

impl InodeWidth {
    pub fn bytes(&self) -> usize {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    fn read(&self, data: &[u8], offset: usize) -> Result<u64> {
        match self {
            Self::Four => bytes::read_be_u32(data, offset).map(u64::from),
            Self::Eight => bytes::read_be_u64(data, offset),
        }
    }
}

/// Short-form directory header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortformHeader {
    pub count: u8,
    pub i8count: u8,
    pub parent: u64,
}

impl ShortformHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let count = bytes::read_u8(data, 0)?;
        let i8count = bytes::read_u8(data, 1)?;
        let width = Self::width_for(i8count);
        Ok(Self {
            count,
            i8count,
            parent: width.read(data, 2)?,
        })
    }

    fn width_for(i8count: u8) -> InodeWidth {
        if i8count == 0 {
            InodeWidth::Four
        } else {
            InodeWidth::Eight
        }
    }

    pub fn inode_width(&self) -> InodeWidth {
        Self::width_for(self.i8count)
    }

    /// Header length: 6 bytes, or 10 with 64-bit inode numbers
    pub fn byte_len(&self) -> usize {
        2 + self.inode_width().bytes()
    }
}

/// One short-form entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortformEntry {
    pub name: Vec<u8>,
    /// Offset tag
    pub tag: u16,
    pub file_type: Option<u8>,
    pub inode: u64,
    /// Bytes the entry occupies
    pub length: usize,
}

impl ShortformEntry {
    /// Fixed bytes before the name
    pub const NAME_OFFSET: usize = 3;

    /// Decode the entry at `offset`
    ///
    /// # Errors
    ///
    /// `TruncatedData` when the declared name or the inode number runs past
    /// the buffer.
    pub fn parse(data: &[u8], offset: usize, width: InodeWidth, has_ftype: bool) -> Result<Self> {
        let name_len = bytes::read_u8(data, offset)? as usize;
        let tag = bytes::read_be_u16(data, offset + 1)?;
        let name = bytes::read_bytes(data, offset + Self::NAME_OFFSET, name_len)?.to_vec();

        let mut pos = offset + Self::NAME_OFFSET + name_len;
        let file_type = if has_ftype {
            let ftype = bytes::read_u8(data, pos)?;
            pos += 1;
            Some(ftype)
        } else {
            None
        };
        let inode = width.read(data, pos)?;

        Ok(Self {
            name,
            tag,
            file_type,
            inode,
            length: Self::entry_length(name_len, width, has_ftype),
        })
    }

    /// Bytes used by an entry with a `name_len` byte name
    pub fn entry_length(name_len: usize, width: InodeWidth, has_ftype: bool) -> usize {
        Self::NAME_OFFSET + name_len + has_ftype as usize + width.bytes()
    }

    /// Offset of the inode number relative to the entry start
    pub fn inode_offset(&self) -> usize {
        Self::NAME_OFFSET + self.name.len() + self.file_type.is_some() as usize
    }

    pub fn to_entry(&self) -> DirectoryEntry {
        DirectoryEntry {
            inode: self.inode,
            name: String::from_utf8_lossy(&self.name).into_owned(),
            record_length: self.length,
            tag_or_offset: self.tag as u64,
            file_type: self.file_type,
        }
    }
}

/// Decoded short-form directory
#[derive(Debug, Clone, Serialize)]
pub struct ShortformDirectory {
    pub header: ShortformHeader,
    pub entries: Vec<ShortformEntry>,
}

impl ShortformDirectory {
    /// Decode the header and all `count` entries of an inline directory
    pub fn parse(data: &[u8], has_ftype: bool) -> Result<Self> {
        let header = ShortformHeader::parse(data)?;
        let width = header.inode_width();

        let mut entries = Vec::with_capacity(header.count as usize);
        let mut offset = header.byte_len();
        for _ in 0..header.count {
            let entry = ShortformEntry::parse(data, offset, width, has_ftype)?;
            offset += entry.length;
            entries.push(entry);
        }

        tracing::trace!(count = header.count, parent = header.parent, "parsed short-form directory");

        Ok(Self { header, entries })
    }

    pub fn parent(&self) -> u64 {
        self.header.parent
    }

    pub fn directory_entries(&self) -> Vec<DirectoryEntry> {
        self.entries.iter().map(ShortformEntry::to_entry).collect()
    }

    /// Total bytes used by header and entries
    pub fn size(&self) -> usize {
        self.header.byte_len() + self.entries.iter().map(|e| e.length).sum::<usize>()
    }

    /// Find an entry by name
    pub fn lookup(&self, name: &[u8]) -> Result<&ShortformEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::not_found(String::from_utf8_lossy(name).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_entry(buf: &mut Vec<u8>, name: &str, tag: u16, ftype: Option<u8>, inode: u64, width: InodeWidth) {
        buf.push(name.len() as u8);
        buf.extend_from_slice(&tag.to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
        if let Some(t) = ftype {
            buf.push(t);
        }
        match width {
            InodeWidth::Four => buf.extend_from_slice(&(inode as u32).to_be_bytes()),
            InodeWidth::Eight => buf.extend_from_slice(&inode.to_be_bytes()),
        }
    }

    #[test]
    fn test_five_byte_name_with_short_inode() {
        let mut raw = Vec::new();
        push_entry(&mut raw, "hello", 0x30, None, 0x0102_0304, InodeWidth::Four);
        assert_eq!(raw.len(), 12);

        let entry = ShortformEntry::parse(&raw, 0, InodeWidth::Four, false).unwrap();
        assert_eq!(entry.name, b"hello");
        assert_eq!(entry.length, 12);
        assert_eq!(entry.inode_offset(), 8);
        assert_eq!(entry.inode, 0x0102_0304);
        assert_eq!(entry.tag, 0x30);
    }

    #[test]
    fn test_entry_lengths() {
        assert_eq!(ShortformEntry::entry_length(5, InodeWidth::Four, false), 12);
        assert_eq!(ShortformEntry::entry_length(5, InodeWidth::Eight, false), 16);
        assert_eq!(ShortformEntry::entry_length(5, InodeWidth::Four, true), 13);
    }

    #[test]
    fn test_name_past_buffer() {
        let raw = [10u8, 0, 0x30, b'a', b'b'];
        assert!(matches!(
            ShortformEntry::parse(&raw, 0, InodeWidth::Four, false),
            Err(Error::TruncatedData { .. })
        ));
    }

    #[test]
    fn test_directory_with_short_inodes() {
        let mut raw = vec![3, 0];
        raw.extend_from_slice(&128u32.to_be_bytes());
        push_entry(&mut raw, "a", 0x60, None, 131, InodeWidth::Four);
        push_entry(&mut raw, "bin", 0x70, None, 132, InodeWidth::Four);
        push_entry(&mut raw, "etc", 0x80, None, 133, InodeWidth::Four);

        let dir = ShortformDirectory::parse(&raw, false).unwrap();
        assert_eq!(dir.parent(), 128);
        assert_eq!(dir.header.byte_len(), 6);
        assert_eq!(dir.entries.len(), 3);
        assert_eq!(dir.lookup(b"bin").unwrap().inode, 132);
        assert!(matches!(dir.lookup(b"usr"), Err(Error::NotFound(_))));
        assert_eq!(dir.size(), raw.len());

        let entries = dir.directory_entries();
        assert_eq!(entries[2].name, "etc");
        assert_eq!(entries[2].tag_or_offset, 0x80);
    }

    #[test]
    fn test_directory_with_large_inodes_and_ftype() {
        let mut raw = vec![2, 1];
        raw.extend_from_slice(&0x1_0000_0080u64.to_be_bytes());
        push_entry(&mut raw, "big", 0x60, Some(1), 0x2_0000_0001, InodeWidth::Eight);
        push_entry(&mut raw, "dir", 0x70, Some(2), 99, InodeWidth::Eight);

        let dir = ShortformDirectory::parse(&raw, true).unwrap();
        assert_eq!(dir.header.inode_width(), InodeWidth::Eight);
        assert_eq!(dir.header.byte_len(), 10);
        assert_eq!(dir.parent(), 0x1_0000_0080);
        assert_eq!(dir.entries[0].inode, 0x2_0000_0001);
        assert_eq!(dir.entries[0].length, 3 + 3 + 1 + 8);
        assert_eq!(dir.entries[1].file_type, Some(2));
        assert_eq!(dir.size(), raw.len());
    }

    #[test]
    fn test_count_past_data() {
        let mut raw = vec![2, 0];
        raw.extend_from_slice(&128u32.to_be_bytes());
        push_entry(&mut raw, "only", 0x60, None, 140, InodeWidth::Four);
        assert!(matches!(
            ShortformDirectory::parse(&raw, false),
            Err(Error::TruncatedData { .. })
        ));
    }
}
