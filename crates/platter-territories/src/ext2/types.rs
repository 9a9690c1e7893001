//! ext2/ext4 directory record structures
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Inode number (0 = deleted)
//! 4       2     Record length (multiple of 4)
//! 6       1     Name length
//! 7       1     File type
//! 8       n     Name (not NUL-terminated)
//! ```
//!
//! All fields are little-endian.

use platter_core::{bytes, DirectoryEntry, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// File type byte of a directory record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Ext2FileType {
    Unknown = 0,
    Regular = 1,
    Directory = 2,
    CharDevice = 3,
    BlockDevice = 4,
    Fifo = 5,
    Socket = 6,
    Symlink = 7,
}

impl Ext2FileType {
    pub fn from_raw(value: u8) -> Self {
        match value {
            1 => Self::Regular,
            2 => Self::Directory,
            3 => Self::CharDevice,
            4 => Self::BlockDevice,
            5 => Self::Fifo,
            6 => Self::Socket,
            7 => Self::Symlink,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Ext2FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Regular => "file",
            Self::Directory => "dir",
            Self::CharDevice => "chr",
            Self::BlockDevice => "blk",
            Self::Fifo => "fifo",
            Self::Socket => "sock",
            Self::Symlink => "link",
        };
        f.write_str(name)
    }
}

/// One directory record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ext2DirectoryRecord {
    pub inode: u32,
    pub rec_len: u16,
    pub file_type: u8,
    pub name: Vec<u8>,
    /// Byte offset of the record in its block
    pub offset: usize,
}

impl Ext2DirectoryRecord {
    /// Fixed part before the name
    pub const HEADER_LEN: usize = 8;

    pub const MAX_NAME_LEN: usize = 255;

    /// Build a record sized to its name
    pub fn new(inode: u32, name: &[u8], file_type: Ext2FileType) -> Result<Self> {
        if name.is_empty() || name.len() > Self::MAX_NAME_LEN {
            return Err(Error::invalid_operation(format!(
                "directory entry name must be 1..={} bytes, got {}",
                Self::MAX_NAME_LEN,
                name.len()
            )));
        }
        let rec_len = Self::minimal_length(name.len());
        Ok(Self {
            inode,
            rec_len: rec_len as u16,
            file_type: file_type as u8,
            name: name.to_vec(),
            offset: 0,
        })
    }

    /// Smallest record that holds a name of `name_len` bytes
    pub fn minimal_length(name_len: usize) -> usize {
        (Self::HEADER_LEN + name_len + 3) & !3
    }

    /// Decode the record at `offset`
    ///
    /// # Errors
    ///
    /// `TruncatedData` when the header or the declared record runs past the
    /// buffer, `Format` when the record length is not a multiple of 4 or
    /// cannot hold the name.
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let header = bytes::read_bytes(data, offset, Self::HEADER_LEN)?;
        let inode = bytes::read_le_u32(header, 0)?;
        let rec_len = bytes::read_le_u16(header, 4)?;
        let name_len = header[6] as usize;
        let file_type = header[7];

        let len = rec_len as usize;
        if len < Self::HEADER_LEN || len % 4 != 0 {
            return Err(Error::format(format!(
                "directory record at {} has invalid length {}",
                offset, rec_len
            )));
        }
        bytes::read_bytes(data, offset, len)?;
        if Self::HEADER_LEN + name_len > len {
            return Err(Error::format(format!(
                "directory record at {}: name of {} bytes exceeds record length {}",
                offset, name_len, rec_len
            )));
        }

        let name = bytes::read_bytes(data, offset + Self::HEADER_LEN, name_len)?.to_vec();
        Ok(Self {
            inode,
            rec_len,
            file_type,
            name,
            offset,
        })
    }

    /// Encode to exactly `rec_len` bytes, zero-padded after the name
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let len = self.rec_len as usize;
        if len < Self::minimal_length(self.name.len()) || len % 4 != 0 {
            return Err(Error::invalid_operation(format!(
                "record length {} cannot hold a {} byte name",
                len,
                self.name.len()
            )));
        }
        let mut out = vec![0u8; len];
        bytes::write_le_u32(&mut out, 0, self.inode)?;
        bytes::write_le_u16(&mut out, 4, self.rec_len)?;
        out[6] = self.name.len() as u8;
        out[7] = self.file_type;
        out[Self::HEADER_LEN..Self::HEADER_LEN + self.name.len()].copy_from_slice(&self.name);
        Ok(out)
    }

    pub fn file_type(&self) -> Ext2FileType {
        Ext2FileType::from_raw(self.file_type)
    }

    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// Slack after the name that a new record could use
    pub fn spare_bytes(&self) -> usize {
        (self.rec_len as usize).saturating_sub(Self::minimal_length(self.name.len()))
    }

    /// Is this a deleted record that only pads its block?
    pub fn is_unused(&self) -> bool {
        self.inode == 0
    }

    pub fn to_entry(&self) -> DirectoryEntry {
        DirectoryEntry {
            inode: self.inode as u64,
            name: self.name_lossy(),
            record_length: self.rec_len as usize,
            tag_or_offset: self.offset as u64,
            file_type: Some(self.file_type),
        }
    }
}

/// ext4 metadata checksum record closing a directory block
///
/// Looks like a deleted record: inode 0, length 12, name length 0, file
/// type 0xDE, followed by the CRC32C of the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumTail {
    pub checksum: u32,
}

impl ChecksumTail {
    pub const FILE_TYPE: u8 = 0xDE;
    pub const LEN: usize = 12;

    /// Decode a checksum tail at `offset`, `None` if the bytes are not one
    pub fn parse(data: &[u8], offset: usize) -> Result<Option<Self>> {
        let raw = bytes::read_bytes(data, offset, Self::LEN)?;
        let is_tail = bytes::read_le_u32(raw, 0)? == 0
            && bytes::read_le_u16(raw, 4)? as usize == Self::LEN
            && raw[6] == 0
            && raw[7] == Self::FILE_TYPE;
        if !is_tail {
            return Ok(None);
        }
        Ok(Some(Self {
            checksum: bytes::read_le_u32(raw, 8)?,
        }))
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[4..6].copy_from_slice(&(Self::LEN as u16).to_le_bytes());
        out[7] = Self::FILE_TYPE;
        out[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        out
    }
}
