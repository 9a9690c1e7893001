//! GPT (GUID Partition Table) partition table implementation

pub mod types;

use crate::registry;
use platter_core::{
    Error, PartitionTableEntry, PartitionTypeCode, Result, ZoneTable, MAX_PARTITION_COUNT,
    SECTOR_SIZE,
};
use types::{GptHeader, GptPartitionEntry};

/// GPT partition table
///
/// The GUID Partition Table is the modern partitioning scheme used by UEFI-based systems.
///
/// # Structure
///
/// ```text
/// LBA 0:    Protective MBR (for backward compatibility)
/// LBA 1:    Primary GPT header
/// LBA 2-33: Partition entries array (typically 128 entries)
/// LBA 34+:  Usable disk space
/// ...
/// Last 33:  Backup partition entries array
/// Last 1:   Backup GPT header
/// ```
///
/// Checksums are checked during parsing but a mismatch does not reject the
/// table; it is reported through [`header_crc_valid`](Self::header_crc_valid),
/// [`entries_crc_valid`](Self::entries_crc_valid) and [`verify`](Self::verify).
#[derive(Debug, Clone)]
pub struct GptZoneTable {
    header: GptHeader,
    entries: Vec<PartitionTableEntry>,
    raw_entries: Vec<GptPartitionEntry>,
    header_crc_valid: bool,
    entries_crc_valid: bool,
}

impl GptZoneTable {
    /// Byte offset of the primary header (LBA 1)
    pub const HEADER_OFFSET: usize = SECTOR_SIZE;

    /// Is `"EFI PART"` present at LBA 1?
    pub fn has_signature(buf: &[u8]) -> bool {
        buf.len() >= Self::HEADER_OFFSET + 8
            && &buf[Self::HEADER_OFFSET..Self::HEADER_OFFSET + 8] == GptHeader::SIGNATURE
    }

    /// Parse the primary GPT from the start of a device
    ///
    /// `buf` holds the device from byte 0. Entries that do not fit in `buf`
    /// are dropped; the entry count is capped at [`MAX_PARTITION_COUNT`].
    ///
    /// # Errors
    ///
    /// Returns an error if the header signature is invalid or the header
    /// itself is truncated.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let header = GptHeader::parse(buf, Self::HEADER_OFFSET)?;
        let header_crc_valid = header.verify_header_crc32(&buf[Self::HEADER_OFFSET..]);
        if !header_crc_valid {
            tracing::warn!("GPT header CRC32 mismatch");
        }

        let (array_offset, array_len) = header
            .entry_array_extent()
            .ok_or_else(|| Error::format("GPT entry array location overflows"))?;

        let entries_crc_valid = match (usize::try_from(array_offset), usize::try_from(array_len)) {
            (Ok(start), Ok(len)) if start.checked_add(len).map_or(false, |end| end <= buf.len()) => {
                header.verify_partition_entries_crc32(&buf[start..start + len])
            }
            _ => false,
        };
        if !entries_crc_valid {
            tracing::warn!("GPT entry array CRC32 mismatch or array not fully available");
        }

        let count = header.num_partition_entries as usize;
        if count > MAX_PARTITION_COUNT {
            tracing::warn!(
                count,
                limit = MAX_PARTITION_COUNT,
                "GPT entry count capped"
            );
        }

        let entry_size = header.partition_entry_size as usize;
        let mut entries = Vec::new();
        let mut raw_entries = Vec::new();

        for i in 0..count.min(MAX_PARTITION_COUNT) {
            let offset = match usize::try_from(array_offset)
                .ok()
                .and_then(|base| base.checked_add(i * entry_size))
            {
                Some(offset) => offset,
                None => break,
            };

            // Records past the end of the buffer are dropped
            let raw = match GptPartitionEntry::parse(buf, offset) {
                Ok(raw) => raw,
                Err(_) => {
                    tracing::debug!(index = i, "GPT entry outside probe window");
                    break;
                }
            };

            if raw.is_unused() {
                continue;
            }

            let type_code = PartitionTypeCode::Guid(*raw.type_guid.as_bytes());
            let type_name = registry::gpt::lookup(raw.type_guid.as_bytes());
            entries.push(
                PartitionTableEntry::new(i, raw.first_lba, raw.size_lba(), type_code, type_name)
                    .with_bootable(raw.is_legacy_bootable())
                    .with_raw_name(raw.name.clone()),
            );
            raw_entries.push(raw);
        }

        tracing::debug!(entries = entries.len(), "parsed GPT");

        Ok(Self {
            header,
            entries,
            raw_entries,
            header_crc_valid,
            entries_crc_valid,
        })
    }

    /// Number of bytes from the start of the device needed to hold the
    /// header and the whole entry array
    pub fn required_len(buf: &[u8]) -> Option<u64> {
        let header = GptHeader::parse(buf, Self::HEADER_OFFSET).ok()?;
        let (offset, len) = header.entry_array_extent()?;
        offset.checked_add(len)
    }

    /// Drop entries that do not fit on a device of `device_sectors` sectors
    pub fn restrict_to(mut self, device_sectors: u64) -> Self {
        let mut kept = self
            .entries
            .iter()
            .map(|e| e.fits_within(device_sectors))
            .collect::<Vec<_>>()
            .into_iter();
        crate::retain_on_device(&mut self.entries, device_sectors, "GPT");
        self.raw_entries.retain(|_| kept.next().unwrap_or(false));
        self
    }

    /// Fail with `ChecksumVerification` if either CRC did not match
    pub fn verify(&self) -> Result<()> {
        if !self.header_crc_valid {
            return Err(Error::ChecksumVerification(
                "GPT header CRC32 verification failed".to_string(),
            ));
        }
        if !self.entries_crc_valid {
            return Err(Error::ChecksumVerification(
                "GPT partition entries CRC32 verification failed".to_string(),
            ));
        }
        Ok(())
    }

    pub fn header_crc_valid(&self) -> bool {
        self.header_crc_valid
    }

    pub fn entries_crc_valid(&self) -> bool {
        self.entries_crc_valid
    }

    /// Get the GPT header
    pub fn header(&self) -> &GptHeader {
        &self.header
    }

    /// Decoded entries, in the same order as [`ZoneTable::entries`]
    pub fn raw_entries(&self) -> &[GptPartitionEntry] {
        &self.raw_entries
    }

    /// Get the number of usable sectors on the disk
    pub fn usable_lba_count(&self) -> u64 {
        if self.header.last_usable_lba >= self.header.first_usable_lba {
            self.header.last_usable_lba - self.header.first_usable_lba + 1
        } else {
            0
        }
    }
}

impl ZoneTable for GptZoneTable {
    fn identify(&self) -> &str {
        "GUID Partition Table"
    }

    fn entries(&self) -> &[PartitionTableEntry] {
        &self.entries
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const BASIC_DATA: [u8; 16] = [
        0xa2, 0xa0, 0xd0, 0xeb, 0xe5, 0xb9, 0x33, 0x44,
        0x87, 0xc0, 0x68, 0xb6, 0xb7, 0x26, 0x99, 0xc7,
    ];

    const LINUX_DATA: [u8; 16] = [
        0xaf, 0x3d, 0xc6, 0x0f, 0x83, 0x84, 0x72, 0x47,
        0x8e, 0x79, 0x3d, 0x69, 0xd8, 0x47, 0x7d, 0xe4,
    ];

    fn put_entry(disk: &mut [u8], slot: usize, type_guid: [u8; 16], first: u64, last: u64, name: &str) {
        let off = 1024 + slot * 128;
        disk[off..off + 16].copy_from_slice(&type_guid);
        disk[off + 16..off + 32].copy_from_slice(&[slot as u8 + 1; 16]);
        disk[off + 32..off + 40].copy_from_slice(&first.to_le_bytes());
        disk[off + 40..off + 48].copy_from_slice(&last.to_le_bytes());
        for (i, unit) in name.encode_utf16().enumerate() {
            disk[off + 56 + i * 2..off + 58 + i * 2].copy_from_slice(&unit.to_le_bytes());
        }
    }

    fn seal(disk: &mut [u8], num_entries: u32) {
        let h = 512;
        let array_len = num_entries as usize * 128;
        let entries_crc = crc32fast::hash(&disk[1024..1024 + array_len]);
        disk[h + 88..h + 92].copy_from_slice(&entries_crc.to_le_bytes());

        disk[h + 16..h + 20].copy_from_slice(&[0; 4]);
        let header_crc = crc32fast::hash(&disk[h..h + 92]);
        disk[h + 16..h + 20].copy_from_slice(&header_crc.to_le_bytes());
    }

    /// A disk image with a GPT of `num_entries` slots and two partitions
    pub(crate) fn create_test_gpt(num_entries: u32) -> Vec<u8> {
        let mut disk = vec![0u8; 1000 * 512];

        // Protective MBR
        disk[0x1BE + 4] = 0xEE;
        disk[0x1BE + 8..0x1BE + 12].copy_from_slice(&1u32.to_le_bytes());
        disk[0x1BE + 12..0x1BE + 16].copy_from_slice(&999u32.to_le_bytes());
        disk[0x1FE] = 0x55;
        disk[0x1FF] = 0xAA;

        let h = 512;
        disk[h..h + 8].copy_from_slice(b"EFI PART");
        disk[h + 8..h + 12].copy_from_slice(&0x0001_0000u32.to_le_bytes());
        disk[h + 12..h + 16].copy_from_slice(&92u32.to_le_bytes());
        disk[h + 24..h + 32].copy_from_slice(&1u64.to_le_bytes());
        disk[h + 32..h + 40].copy_from_slice(&999u64.to_le_bytes());
        disk[h + 40..h + 48].copy_from_slice(&34u64.to_le_bytes());
        disk[h + 48..h + 56].copy_from_slice(&966u64.to_le_bytes());
        disk[h + 56..h + 72].copy_from_slice(&[0x5A; 16]);
        disk[h + 72..h + 80].copy_from_slice(&2u64.to_le_bytes());
        disk[h + 80..h + 84].copy_from_slice(&num_entries.to_le_bytes());
        disk[h + 84..h + 88].copy_from_slice(&128u32.to_le_bytes());

        put_entry(&mut disk, 0, BASIC_DATA, 100, 199, "Data");
        put_entry(&mut disk, 2, LINUX_DATA, 200, 899, "root");

        seal(&mut disk, num_entries);
        disk
    }

    #[test]
    fn test_parse_valid_gpt() {
        let table = GptZoneTable::parse(&create_test_gpt(128)).unwrap();

        assert_eq!(table.identify(), "GUID Partition Table");
        assert!(table.header_crc_valid());
        assert!(table.entries_crc_valid());
        table.verify().unwrap();
        assert_eq!(table.usable_lba_count(), 933);
        assert_eq!(table.header().disk_guid.as_bytes(), &[0x5A; 16]);
    }

    #[test]
    fn test_parse_gpt_entries() {
        let table = GptZoneTable::parse(&create_test_gpt(128)).unwrap();
        let entries = table.entries();

        // Unused slot 1 is skipped
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 0);
        assert_eq!(entries[0].type_name, "MICROSOFT_BASIC_DATA_PARTITION");
        assert_eq!(entries[0].start_sector, 100);
        assert_eq!(entries[0].sector_count, 100);
        assert_eq!(entries[0].raw_name, "Data");

        assert_eq!(entries[1].index, 2);
        assert_eq!(entries[1].type_name, "LINUX_FILESYSTEM_DATA");
        assert_eq!(entries[1].type_code, PartitionTypeCode::Guid(LINUX_DATA));
        assert_eq!(table.raw_entries()[1].name, "root");
    }

    #[test]
    fn test_unknown_type_guid() {
        let mut disk = create_test_gpt(4);
        put_entry(&mut disk, 3, [0x77; 16], 900, 950, "");
        seal(&mut disk, 4);

        let table = GptZoneTable::parse(&disk).unwrap();
        assert_eq!(table.entries()[2].type_name, "UNKNOWN");
    }

    #[test]
    fn test_parse_invalid_gpt_signature() {
        let mut disk = create_test_gpt(128);
        disk[512] = 0xFF;

        assert!(!GptZoneTable::has_signature(&disk));
        assert!(matches!(GptZoneTable::parse(&disk), Err(Error::Format(_))));
    }

    #[test]
    fn test_header_crc_mismatch_is_reported() {
        let mut disk = create_test_gpt(128);
        disk[512 + 50] = 0xFF;

        let table = GptZoneTable::parse(&disk).unwrap();
        assert!(!table.header_crc_valid());
        assert!(matches!(table.verify(), Err(Error::ChecksumVerification(_))));
    }

    #[test]
    fn test_entries_crc_mismatch_is_reported() {
        let mut disk = create_test_gpt(128);
        disk[1024 + 100] = 0xFF;

        let table = GptZoneTable::parse(&disk).unwrap();
        assert!(table.header_crc_valid());
        assert!(!table.entries_crc_valid());
        assert!(table.verify().is_err());
    }

    #[test]
    fn test_entries_beyond_buffer_are_dropped() {
        let disk = create_test_gpt(128);

        // Slot 2 ends at 1024 + 3 * 128
        let table = GptZoneTable::parse(&disk[..1024 + 2 * 128]).unwrap();
        assert_eq!(table.entries().len(), 1);
        assert!(!table.entries_crc_valid());
    }

    #[test]
    fn test_required_len() {
        let disk = create_test_gpt(128);
        assert_eq!(GptZoneTable::required_len(&disk), Some(1024 + 128 * 128));
        assert_eq!(GptZoneTable::required_len(&[0u8; 512]), None);
    }

    #[test]
    fn test_restrict_to_device() {
        let table = GptZoneTable::parse(&create_test_gpt(128)).unwrap();
        let table = table.restrict_to(500);
        assert_eq!(table.entries().len(), 1);
        assert_eq!(table.raw_entries().len(), 1);
        assert_eq!(table.raw_entries()[0].name, "Data");
    }
}
