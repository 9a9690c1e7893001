//! Primitive readers and writers over byte buffers
//!
//! Every on-disk format in Platter is decoded through these helpers. Readers
//! never panic: a read that would run past the buffer returns
//! [`Error::TruncatedData`].

use crate::{Error, Result};

/// Borrow `len` bytes at `offset`, or fail with a truncation error
#[inline]
pub fn read_bytes(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| Error::truncated(len, offset, data.len()))?;
    if end > data.len() {
        return Err(Error::truncated(len, offset, data.len()));
    }
    Ok(&data[offset..end])
}

/// Copy a fixed-size array out of the buffer
#[inline]
pub fn read_array<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(read_bytes(data, offset, N)?);
    Ok(out)
}

#[inline]
pub fn read_u8(data: &[u8], offset: usize) -> Result<u8> {
    Ok(read_bytes(data, offset, 1)?[0])
}

#[inline]
pub fn read_le_u16(data: &[u8], offset: usize) -> Result<u16> {
    Ok(u16::from_le_bytes(read_array(data, offset)?))
}

#[inline]
pub fn read_le_u32(data: &[u8], offset: usize) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(data, offset)?))
}

#[inline]
pub fn read_le_u64(data: &[u8], offset: usize) -> Result<u64> {
    Ok(u64::from_le_bytes(read_array(data, offset)?))
}

#[inline]
pub fn read_be_u16(data: &[u8], offset: usize) -> Result<u16> {
    Ok(u16::from_be_bytes(read_array(data, offset)?))
}

#[inline]
pub fn read_be_u32(data: &[u8], offset: usize) -> Result<u32> {
    Ok(u32::from_be_bytes(read_array(data, offset)?))
}

#[inline]
pub fn read_be_u64(data: &[u8], offset: usize) -> Result<u64> {
    Ok(u64::from_be_bytes(read_array(data, offset)?))
}

/// Read a null-padded ASCII field, stopping at the first NUL
pub fn read_ascii_z(data: &[u8], offset: usize, len: usize) -> Result<String> {
    let raw = read_bytes(data, offset, len)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

#[inline]
fn write_bytes(data: &mut [u8], offset: usize, bytes: &[u8]) -> Result<()> {
    let len = data.len();
    let end = offset
        .checked_add(bytes.len())
        .ok_or_else(|| Error::truncated(bytes.len(), offset, len))?;
    let target = data
        .get_mut(offset..end)
        .ok_or_else(|| Error::truncated(bytes.len(), offset, len))?;
    target.copy_from_slice(bytes);
    Ok(())
}

pub fn write_le_u16(data: &mut [u8], offset: usize, value: u16) -> Result<()> {
    write_bytes(data, offset, &value.to_le_bytes())
}

pub fn write_le_u32(data: &mut [u8], offset: usize, value: u32) -> Result<()> {
    write_bytes(data, offset, &value.to_le_bytes())
}

pub fn write_le_u64(data: &mut [u8], offset: usize, value: u64) -> Result<()> {
    write_bytes(data, offset, &value.to_le_bytes())
}

pub fn write_be_u16(data: &mut [u8], offset: usize, value: u16) -> Result<()> {
    write_bytes(data, offset, &value.to_be_bytes())
}

pub fn write_be_u32(data: &mut [u8], offset: usize, value: u32) -> Result<()> {
    write_bytes(data, offset, &value.to_be_bytes())
}

pub fn write_be_u64(data: &mut [u8], offset: usize, value: u64) -> Result<()> {
    write_bytes(data, offset, &value.to_be_bytes())
}

/// Sequential reader over a byte buffer
///
/// Useful for records whose fields follow each other without fixed offsets
/// (variable-length names, optional bytes).
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Start a cursor at `position`
    pub fn new(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    /// Current offset into the underlying buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left after the current position
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Advance without reading
    pub fn skip(&mut self, len: usize) -> Result<()> {
        read_bytes(self.data, self.position, len)?;
        self.position += len;
        Ok(())
    }

    /// Advance to the next multiple of `align` relative to `base`
    pub fn align_to(&mut self, base: usize, align: usize) -> Result<()> {
        let rel = self.position.saturating_sub(base);
        let padded = (rel + align - 1) / align * align;
        self.skip(padded - rel)
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let out = read_bytes(self.data, self.position, len)?;
        self.position += len;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        let v = read_u8(self.data, self.position)?;
        self.position += 1;
        Ok(v)
    }

    pub fn be_u16(&mut self) -> Result<u16> {
        let v = read_be_u16(self.data, self.position)?;
        self.position += 2;
        Ok(v)
    }

    pub fn be_u32(&mut self) -> Result<u32> {
        let v = read_be_u32(self.data, self.position)?;
        self.position += 4;
        Ok(v)
    }

    pub fn be_u64(&mut self) -> Result<u64> {
        let v = read_be_u64(self.data, self.position)?;
        self.position += 8;
        Ok(v)
    }

    pub fn le_u16(&mut self) -> Result<u16> {
        let v = read_le_u16(self.data, self.position)?;
        self.position += 2;
        Ok(v)
    }

    pub fn le_u32(&mut self) -> Result<u32> {
        let v = read_le_u32(self.data, self.position)?;
        self.position += 4;
        Ok(v)
    }

    pub fn le_u64(&mut self) -> Result<u64> {
        let v = read_le_u64(self.data, self.position)?;
        self.position += 8;
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_endian_reads() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];

        assert_eq!(read_u8(&data, 1).unwrap(), 0x34);
        assert_eq!(read_le_u16(&data, 0).unwrap(), 0x3412);
        assert_eq!(read_be_u16(&data, 0).unwrap(), 0x1234);
        assert_eq!(read_le_u32(&data, 0).unwrap(), 0x78563412);
        assert_eq!(read_be_u32(&data, 4).unwrap(), 0x9ABCDEF0);
        assert_eq!(read_be_u64(&data, 0).unwrap(), 0x123456789ABCDEF0);
        assert_eq!(read_le_u64(&data, 0).unwrap(), 0xF0DEBC9A78563412);
    }

    #[test]
    fn test_read_past_end_is_truncated() {
        let data = [0u8; 6];
        let err = read_le_u32(&data, 4).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedData {
                needed: 4,
                offset: 4,
                available: 2
            }
        ));

        assert!(read_bytes(&data, usize::MAX, 2).is_err());
    }

    #[test]
    fn test_ascii_z_stops_at_nul() {
        let mut data = [0u8; 32];
        data[..5].copy_from_slice(b"Apple");
        assert_eq!(read_ascii_z(&data, 0, 32).unwrap(), "Apple");

        // Field without terminator uses the whole width
        assert_eq!(read_ascii_z(b"PM", 0, 2).unwrap(), "PM");
    }

    #[test]
    fn test_writers_match_readers() {
        let mut data = [0u8; 16];
        write_le_u32(&mut data, 0, 0xDEADBEEF).unwrap();
        write_be_u64(&mut data, 4, 42).unwrap();
        write_be_u16(&mut data, 12, 0xABCD).unwrap();

        assert_eq!(&data[0..4], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(read_be_u64(&data, 4).unwrap(), 42);
        assert_eq!(read_be_u16(&data, 12).unwrap(), 0xABCD);
        assert!(write_le_u32(&mut data, 14, 1).is_err());
    }

    #[test]
    fn test_cursor_sequence() {
        let data = [5u8, 0x00, 0x10, b'h', b'e', b'l', b'l', b'o', 0, 0, 0, 7];
        let mut cursor = ByteCursor::new(&data, 0);

        let len = cursor.u8().unwrap() as usize;
        assert_eq!(cursor.be_u16().unwrap(), 0x10);
        assert_eq!(cursor.bytes(len).unwrap(), b"hello");
        assert_eq!(cursor.be_u32().unwrap(), 7);
        assert_eq!(cursor.remaining(), 0);
        assert!(cursor.u8().is_err());
    }

    #[test]
    fn test_cursor_align() {
        let data = [0u8; 16];
        let mut cursor = ByteCursor::new(&data, 3);
        cursor.align_to(0, 8).unwrap();
        assert_eq!(cursor.position(), 8);

        // Already aligned stays put
        cursor.align_to(0, 8).unwrap();
        assert_eq!(cursor.position(), 8);
    }
}
