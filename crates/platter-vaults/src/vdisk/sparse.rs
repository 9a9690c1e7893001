//! Hosted sparse extents
//!
//! A sparse extent file starts with a 512-byte little-endian header:
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic "KDMV"
//! 4       4     Version
//! 8       4     Flags
//! 12      8     Capacity (sectors)
//! 20      8     Grain size (sectors, power of two)
//! 28      8     Embedded descriptor offset (sectors)
//! 36      8     Embedded descriptor size (sectors)
//! 44      4     Grain table entries per grain table
//! 48      8     Redundant grain directory offset (sectors)
//! 56      8     Grain directory offset (sectors)
//! 64      8     Overhead (sectors)
//! 72      1     Unclean shutdown
//! 73      4     Newline detection bytes '\n' ' ' '\r' '\n'
//! 77      2     Compression algorithm
//! ```
//!
//! Sector addressing goes grain directory -> grain table -> grain. A grain
//! table entry of zero means the grain was never written and reads as zeros.

use platter_core::{
    bytes, checked_multiply_u64, sectors_for, validate_allocation_size, Error, Result,
    MAX_ALLOCATION_SIZE, MAX_DESCRIPTOR_SIZE, SECTOR_SIZE,
};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

const SECTOR: u64 = SECTOR_SIZE as u64;

/// Decoded sparse extent header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseExtentHeader {
    pub version: u32,
    pub flags: u32,
    pub capacity: u64,
    pub grain_size: u64,
    pub descriptor_offset: u64,
    pub descriptor_size: u64,
    pub num_gtes_per_gt: u32,
    pub rgd_offset: u64,
    pub gd_offset: u64,
    pub overhead: u64,
    pub unclean_shutdown: bool,
    pub compress_algorithm: u16,
}

impl SparseExtentHeader {
    /// "KDMV" read as a little-endian u32
    pub const MAGIC: u32 = 0x564D_444B;
    pub const MAGIC_BYTES: &'static [u8; 4] = b"KDMV";

    pub const SIZE: usize = SECTOR_SIZE;

    pub const FLAG_VALID_NEWLINE_TEST: u32 = 1 << 0;
    pub const FLAG_REDUNDANT_GRAIN_TABLE: u32 = 1 << 1;
    pub const FLAG_COMPRESSED: u32 = 1 << 16;
    pub const FLAG_MARKERS: u32 = 1 << 17;

    /// Grain directory stored at the end of a stream-optimized file
    pub const GD_AT_END: u64 = u64::MAX;

    /// Entries per grain table written by [`create_sparse_extent`]
    pub const DEFAULT_GTES_PER_GT: u32 = 512;

    /// Decode the header at the start of `data`
    ///
    /// # Errors
    ///
    /// Format error on a wrong magic, a grain size that is not a power of
    /// two, or an empty grain table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if bytes::read_bytes(data, 0, 4)? != Self::MAGIC_BYTES {
            return Err(Error::format("Sparse extent magic is not KDMV"));
        }

        let header = Self {
            version: bytes::read_le_u32(data, 4)?,
            flags: bytes::read_le_u32(data, 8)?,
            capacity: bytes::read_le_u64(data, 12)?,
            grain_size: bytes::read_le_u64(data, 20)?,
            descriptor_offset: bytes::read_le_u64(data, 28)?,
            descriptor_size: bytes::read_le_u64(data, 36)?,
            num_gtes_per_gt: bytes::read_le_u32(data, 44)?,
            rgd_offset: bytes::read_le_u64(data, 48)?,
            gd_offset: bytes::read_le_u64(data, 56)?,
            overhead: bytes::read_le_u64(data, 64)?,
            unclean_shutdown: bytes::read_u8(data, 72)? != 0,
            compress_algorithm: bytes::read_le_u16(data, 77)?,
        };

        if header.grain_size == 0 || !header.grain_size.is_power_of_two() {
            return Err(Error::format(format!(
                "Grain size {} is not a power of two",
                header.grain_size
            )));
        }
        if header.num_gtes_per_gt == 0 {
            return Err(Error::format("Grain table holds no entries"));
        }

        Ok(header)
    }

    /// Read and decode the header from the start of a file
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; Self::SIZE];
        reader.seek(SeekFrom::Start(0))?;
        reader.read_exact(&mut buf)?;
        Self::parse(&buf)
    }

    /// Sectors covered by one grain table
    pub fn grain_table_coverage(&self) -> u64 {
        self.grain_size.saturating_mul(self.num_gtes_per_gt as u64)
    }

    /// Number of grain directory entries needed for the capacity
    pub fn gd_entries(&self) -> u64 {
        self.capacity.div_ceil(self.grain_table_coverage())
    }

    /// Bytes of one grain table
    pub fn grain_table_bytes(&self) -> u64 {
        self.num_gtes_per_gt as u64 * 4
    }

    pub fn has_redundant_directory(&self) -> bool {
        self.flags & Self::FLAG_REDUNDANT_GRAIN_TABLE != 0 && self.rgd_offset != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & Self::FLAG_COMPRESSED != 0 || self.compress_algorithm != 0
    }

    pub fn has_embedded_descriptor(&self) -> bool {
        self.descriptor_offset != 0 && self.descriptor_size != 0
    }

    /// Reject layouts this reader cannot address
    pub fn check_supported(&self) -> Result<()> {
        if self.is_compressed() {
            return Err(Error::unsupported(format!(
                "Compressed sparse extent (algorithm {})",
                self.compress_algorithm
            )));
        }
        if self.flags & Self::FLAG_MARKERS != 0 || self.gd_offset == Self::GD_AT_END {
            return Err(Error::unsupported("Stream-optimized sparse extent"));
        }
        if self.gd_offset == 0 {
            return Err(Error::format("Sparse extent has no grain directory"));
        }
        Ok(())
    }

    /// Read the embedded descriptor, `None` if the file carries none
    pub fn read_embedded_descriptor<R: Read + Seek>(&self, reader: &mut R) -> Result<Option<Vec<u8>>> {
        if !self.has_embedded_descriptor() {
            return Ok(None);
        }
        let len = checked_multiply_u64(self.descriptor_size, SECTOR, "embedded descriptor")?;
        let len = validate_allocation_size(len, MAX_DESCRIPTOR_SIZE, "embedded descriptor")?;
        let offset = checked_multiply_u64(self.descriptor_offset, SECTOR, "embedded descriptor")?;

        let mut buf = vec![0u8; len];
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(&mut buf)?;
        Ok(Some(buf))
    }

    /// Encode the header into one sector
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(Self::MAGIC_BYTES);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.flags.to_le_bytes());
        buf[12..20].copy_from_slice(&self.capacity.to_le_bytes());
        buf[20..28].copy_from_slice(&self.grain_size.to_le_bytes());
        buf[28..36].copy_from_slice(&self.descriptor_offset.to_le_bytes());
        buf[36..44].copy_from_slice(&self.descriptor_size.to_le_bytes());
        buf[44..48].copy_from_slice(&self.num_gtes_per_gt.to_le_bytes());
        buf[48..56].copy_from_slice(&self.rgd_offset.to_le_bytes());
        buf[56..64].copy_from_slice(&self.gd_offset.to_le_bytes());
        buf[64..72].copy_from_slice(&self.overhead.to_le_bytes());
        buf[72] = self.unclean_shutdown as u8;
        buf[73..77].copy_from_slice(b"\n \r\n");
        buf[77..79].copy_from_slice(&self.compress_algorithm.to_le_bytes());
        buf
    }
}

/// Write an empty sparse extent with preallocated grain tables
///
/// Layout: header, optional embedded descriptor, redundant directory and
/// tables, primary directory and tables, padding to a grain boundary.
pub fn create_sparse_extent<W: Write + Seek>(
    writer: &mut W,
    capacity: u64,
    grain_size: u64,
    descriptor: Option<&[u8]>,
) -> Result<SparseExtentHeader> {
    let descriptor_size = descriptor.map_or(0, |d| sectors_for(d.len()));

    let mut header = SparseExtentHeader {
        version: 1,
        flags: SparseExtentHeader::FLAG_VALID_NEWLINE_TEST
            | SparseExtentHeader::FLAG_REDUNDANT_GRAIN_TABLE,
        capacity,
        grain_size,
        descriptor_offset: if descriptor_size > 0 { 1 } else { 0 },
        descriptor_size,
        num_gtes_per_gt: SparseExtentHeader::DEFAULT_GTES_PER_GT,
        rgd_offset: 0,
        gd_offset: 0,
        overhead: 0,
        unclean_shutdown: false,
        compress_algorithm: 0,
    };
    if grain_size == 0 || !grain_size.is_power_of_two() {
        return Err(Error::format(format!("Grain size {} is not a power of two", grain_size)));
    }

    let gd_entries = header.gd_entries();
    let gd_bytes = checked_multiply_u64(gd_entries, 4, "grain directory")?;
    let gd_sectors = sectors_for(validate_allocation_size(
        gd_bytes,
        MAX_ALLOCATION_SIZE,
        "grain directory",
    )?);
    let gt_sectors = sectors_for(header.grain_table_bytes() as usize);
    let tables_sectors = checked_multiply_u64(gd_entries, gt_sectors, "grain tables")?;

    header.rgd_offset = 1 + descriptor_size;
    header.gd_offset = header.rgd_offset + gd_sectors + tables_sectors;
    let metadata_end = header.gd_offset + gd_sectors + tables_sectors;
    header.overhead = metadata_end.div_ceil(grain_size) * grain_size;

    writer.seek(SeekFrom::Start(0))?;
    writer.write_all(&header.to_bytes())?;

    if let Some(text) = descriptor {
        let mut padded = text.to_vec();
        padded.resize(descriptor_size as usize * SECTOR_SIZE, 0);
        writer.write_all(&padded)?;
    }

    for dir_offset in [header.rgd_offset, header.gd_offset] {
        let first_table = dir_offset + gd_sectors;
        let mut dir = vec![0u8; gd_sectors as usize * SECTOR_SIZE];
        for i in 0..gd_entries {
            let table_sector = first_table + i * gt_sectors;
            let entry = u32::try_from(table_sector)
                .map_err(|_| Error::invalid_operation("Grain table beyond 32-bit sector range"))?;
            bytes::write_le_u32(&mut dir, i as usize * 4, entry)?;
        }
        writer.seek(SeekFrom::Start(dir_offset * SECTOR))?;
        writer.write_all(&dir)?;
        writer.write_all(&vec![0u8; tables_sectors as usize * SECTOR_SIZE])?;
    }

    // Extend the file to the end of the overhead
    writer.seek(SeekFrom::Start(header.overhead * SECTOR - 1))?;
    writer.write_all(&[0])?;
    writer.flush()?;

    tracing::debug!(capacity, grain_size, gd_entries, overhead = header.overhead, "created sparse extent");
    Ok(header)
}

/// Sector I/O against one sparse extent file
#[derive(Debug)]
pub struct SparseExtentIo {
    file: File,
    header: SparseExtentHeader,
    gd: Vec<u32>,
    rgd: Option<Vec<u32>>,
    writable: bool,
    /// Next free sector at the end of the file
    next_free: u64,
}

impl SparseExtentIo {
    /// Load header and grain directories from an open extent file
    pub fn new(mut file: File, writable: bool) -> Result<Self> {
        let header = SparseExtentHeader::read_from(&mut file)?;
        header.check_supported()?;

        let gd = read_directory(&mut file, header.gd_offset, header.gd_entries())?;
        let rgd = if header.has_redundant_directory() {
            Some(read_directory(&mut file, header.rgd_offset, header.gd_entries())?)
        } else {
            None
        };

        let file_len = file.metadata()?.len();
        let next_free = file_len.div_ceil(SECTOR).max(header.overhead);

        tracing::debug!(
            capacity = header.capacity,
            grain_size = header.grain_size,
            gd_entries = gd.len(),
            redundant = rgd.is_some(),
            "opened sparse extent"
        );

        Ok(Self {
            file,
            header,
            gd,
            rgd,
            writable,
            next_free,
        })
    }

    pub fn header(&self) -> &SparseExtentHeader {
        &self.header
    }

    /// Sector in the file holding `local`, `None` when its grain is unallocated
    pub fn locate(&mut self, local: u64) -> Result<Option<u64>> {
        self.check_capacity(local)?;
        let Some(entry_offset) = self.gte_offset(&self.gd, local) else {
            return Ok(None);
        };
        let grain = self.read_gte(entry_offset)?;
        if grain == 0 {
            return Ok(None);
        }
        Ok(Some(grain as u64 + local % self.header.grain_size))
    }

    pub fn read_sector(&mut self, local: u64, buf: &mut [u8]) -> Result<()> {
        match self.locate(local)? {
            Some(sector) => {
                self.file.seek(SeekFrom::Start(sector * SECTOR))?;
                self.file.read_exact(buf)?;
            }
            None => buf.fill(0),
        }
        Ok(())
    }

    pub fn write_sector(&mut self, local: u64, buf: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(Error::permission_denied("sparse extent opened read-only"));
        }
        let sector = match self.locate(local)? {
            Some(sector) => sector,
            None => self.allocate_grain(local)? + local % self.header.grain_size,
        };
        self.file.seek(SeekFrom::Start(sector * SECTOR))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.writable {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn check_capacity(&self, local: u64) -> Result<()> {
        if local >= self.header.capacity {
            return Err(Error::bounds(
                i64::try_from(local).unwrap_or(i64::MAX),
                self.header.capacity,
            ));
        }
        Ok(())
    }

    /// Byte offset of the grain table entry for `local` in the directory `dir`
    fn gte_offset(&self, dir: &[u32], local: u64) -> Option<u64> {
        let coverage = self.header.grain_table_coverage();
        let gd_index = (local / coverage) as usize;
        let table = *dir.get(gd_index)?;
        if table == 0 {
            return None;
        }
        let gt_index = (local % coverage) / self.header.grain_size;
        Some(table as u64 * SECTOR + gt_index * 4)
    }

    fn read_gte(&mut self, offset: u64) -> Result<u32> {
        let mut entry = [0u8; 4];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut entry)?;
        Ok(u32::from_le_bytes(entry))
    }

    fn write_gte(&mut self, offset: u64, grain: u32) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&grain.to_le_bytes())?;
        Ok(())
    }

    /// Append a zeroed grain and point both grain tables at it
    fn allocate_grain(&mut self, local: u64) -> Result<u64> {
        let primary = self
            .gte_offset(&self.gd, local)
            .ok_or_else(|| Error::unsupported("Grain table not preallocated"))?;
        let redundant = self.rgd.as_deref().and_then(|rgd| self.gte_offset(rgd, local));

        let grain = self.next_free;
        let entry = u32::try_from(grain)
            .map_err(|_| Error::invalid_operation("Sparse extent grown past 32-bit sector range"))?;

        let grain_bytes = checked_multiply_u64(self.header.grain_size, SECTOR, "grain")?;
        let grain_bytes = validate_allocation_size(grain_bytes, MAX_ALLOCATION_SIZE, "grain")?;
        self.file.seek(SeekFrom::Start(grain * SECTOR))?;
        self.file.write_all(&vec![0u8; grain_bytes])?;

        self.write_gte(primary, entry)?;
        if let Some(offset) = redundant {
            self.write_gte(offset, entry)?;
        }
        self.next_free += self.header.grain_size;

        tracing::debug!(local, grain, "allocated grain");
        Ok(grain)
    }
}

fn read_directory(file: &mut File, offset: u64, entries: u64) -> Result<Vec<u32>> {
    let len = checked_multiply_u64(entries, 4, "grain directory")?;
    let len = validate_allocation_size(len, MAX_ALLOCATION_SIZE, "grain directory")?;
    let mut raw = vec![0u8; len];
    file.seek(SeekFrom::Start(checked_multiply_u64(offset, SECTOR, "grain directory")?))?;
    file.read_exact(&mut raw)?;
    Ok(raw
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use tempfile::NamedTempFile;

    fn new_extent(capacity: u64, grain_size: u64) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        create_sparse_extent(tmp.as_file_mut(), capacity, grain_size, None).unwrap();
        tmp
    }

    fn open_rw(tmp: &NamedTempFile) -> SparseExtentIo {
        let file = OpenOptions::new().read(true).write(true).open(tmp.path()).unwrap();
        SparseExtentIo::new(file, true).unwrap()
    }

    #[test]
    fn test_header_fields() {
        let tmp = new_extent(4096, 16);
        let header = SparseExtentHeader::read_from(&mut tmp.reopen().unwrap()).unwrap();

        assert_eq!(header.capacity, 4096);
        assert_eq!(header.grain_size, 16);
        assert_eq!(header.num_gtes_per_gt, 512);
        assert_eq!(header.grain_table_coverage(), 8192);
        assert_eq!(header.gd_entries(), 1);
        assert!(header.has_redundant_directory());
        assert_eq!(header.overhead % 16, 0);
        assert!(header.check_supported().is_ok());
    }

    #[test]
    fn test_bad_magic_and_grain_size() {
        assert!(matches!(SparseExtentHeader::parse(&[0u8; 512]), Err(Error::Format(_))));

        let mut raw = new_header(100, 8).to_bytes();
        raw[20..28].copy_from_slice(&12u64.to_le_bytes());
        assert!(matches!(SparseExtentHeader::parse(&raw), Err(Error::Format(_))));
    }

    fn new_header(capacity: u64, grain_size: u64) -> SparseExtentHeader {
        SparseExtentHeader {
            version: 1,
            flags: 0,
            capacity,
            grain_size,
            descriptor_offset: 0,
            descriptor_size: 0,
            num_gtes_per_gt: 512,
            rgd_offset: 0,
            gd_offset: 1,
            overhead: 8,
            unclean_shutdown: false,
            compress_algorithm: 0,
        }
    }

    #[test]
    fn test_compressed_is_unsupported() {
        let mut header = new_header(100, 8);
        header.compress_algorithm = 1;
        let parsed = SparseExtentHeader::parse(&header.to_bytes()).unwrap();
        assert!(matches!(parsed.check_supported(), Err(Error::UnsupportedVariant(_))));

        let mut header = new_header(100, 8);
        header.gd_offset = SparseExtentHeader::GD_AT_END;
        assert!(matches!(header.check_supported(), Err(Error::UnsupportedVariant(_))));
    }

    #[test]
    fn test_unallocated_reads_zero() {
        let tmp = new_extent(4096, 16);
        let mut io = open_rw(&tmp);

        assert_eq!(io.locate(100).unwrap(), None);
        let mut buf = [0xFFu8; 512];
        io.read_sector(100, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_allocates_grain_in_both_tables() {
        let tmp = new_extent(4096, 16);
        let mut io = open_rw(&tmp);
        let overhead = io.header().overhead;

        io.write_sector(35, &[0xAB; 512]).unwrap();
        // Sector 35 lives in grain 2, offset 3
        assert_eq!(io.locate(35).unwrap(), Some(overhead + 3));
        // Neighbours in the same grain are allocated but still zero
        let mut buf = [0xFFu8; 512];
        io.read_sector(32, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
        io.flush().unwrap();
        drop(io);

        let mut io = open_rw(&tmp);
        let mut buf = [0u8; 512];
        io.read_sector(35, &mut buf).unwrap();
        assert_eq!(buf, [0xAB; 512]);

        let primary = io.gte_offset(&io.gd, 35).unwrap();
        let redundant = io.gte_offset(io.rgd.as_deref().unwrap(), 35).unwrap();
        assert_ne!(primary, redundant);
        assert_eq!(io.read_gte(primary).unwrap(), io.read_gte(redundant).unwrap());
    }

    #[test]
    fn test_second_grain_appends() {
        let tmp = new_extent(4096, 16);
        let mut io = open_rw(&tmp);
        let overhead = io.header().overhead;

        io.write_sector(0, &[1; 512]).unwrap();
        io.write_sector(4000, &[2; 512]).unwrap();
        assert_eq!(io.locate(0).unwrap(), Some(overhead));
        assert_eq!(io.locate(4000).unwrap(), Some(overhead + 16 + 4000 % 16));
    }

    #[test]
    fn test_read_only_rejects_write() {
        let tmp = new_extent(64, 8);
        let mut io = SparseExtentIo::new(tmp.reopen().unwrap(), false).unwrap();
        assert!(matches!(
            io.write_sector(0, &[0; 512]),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_beyond_capacity() {
        let tmp = new_extent(64, 8);
        let mut io = open_rw(&tmp);
        assert!(matches!(io.locate(64), Err(Error::Bounds { .. })));
    }

    #[test]
    fn test_embedded_descriptor() {
        let mut tmp = NamedTempFile::new().unwrap();
        let text = b"RW 64 SPARSE \"self.vmdk\"\n";
        let header = create_sparse_extent(tmp.as_file_mut(), 64, 8, Some(text)).unwrap();
        assert!(header.has_embedded_descriptor());

        let embedded = header
            .read_embedded_descriptor(&mut tmp.reopen().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(embedded.len(), 512);
        assert_eq!(&embedded[..text.len()], text);
        assert!(embedded[text.len()..].iter().all(|&b| b == 0));
    }
}
