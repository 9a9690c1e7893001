//! GPT partition type GUID registry

use crate::guid::Guid;

/// `(symbolic name, canonical GUID)`, searched in order
static GPT_TYPES: &[(&str, &str)] = &[
    ("UNUSED_ENTRY", "00000000-0000-0000-0000-000000000000"),
    ("MBR_PARTITION_SCHEME", "024DEE41-33E7-11D3-9D69-0008C781F39F"),
    ("EFI_SYSTEM_PARTITION", "C12A7328-F81F-11D2-BA4B-00A0C93EC93B"),
    ("BIOS_BOOT_PARTITION", "21686148-6449-6E6F-744E-656564454649"),
    ("INTEL_FAST_FLASH", "D3BFE2DE-3DAF-11DF-BA40-E3A556D89593"),
    ("SONY_BOOT_PARTITION", "F4019732-066E-4E12-8273-346C5641494F"),
    ("LENOVO_BOOT_PARTITION", "BFBFAFE7-A34F-448A-9A5B-6213EB736C22"),
    // Windows
    ("MICROSOFT_RESERVED_PARTITION", "E3C9E316-0B5C-4DB8-817D-F92DF00215AE"),
    ("MICROSOFT_BASIC_DATA_PARTITION", "EBD0A0A2-B9E5-4433-87C0-68B6B72699C7"),
    ("MICROSOFT_LDM_METADATA_PARTITION", "5808C8AA-7E8F-42E0-85D2-E1E90434CFB3"),
    ("MICROSOFT_LDM_DATA_PARTITION", "AF9B60A0-1431-4F62-BC68-3311714A69AD"),
    ("WINDOWS_RECOVERY_ENVIRONMENT", "DE94BBA4-06D1-4D40-A16A-BFD50179D6AC"),
    ("IBM_GPFS_PARTITION", "37AFFC90-EF7D-4E96-91C3-2D7AE055B174"),
    ("MICROSOFT_STORAGE_SPACES", "E75CAF8F-F680-4CEE-AFA3-B001E56EFC2D"),
    // HP-UX
    ("HPUX_DATA_PARTITION", "75894C1E-3AEB-11D3-B7C1-7B03A0000000"),
    ("HPUX_SERVICE_PARTITION", "E2A1E728-32E3-11D6-A682-7B03A0000000"),
    // Linux
    ("LINUX_FILESYSTEM_DATA", "0FC63DAF-8483-4772-8E79-3D69D8477DE4"),
    ("LINUX_RAID_PARTITION", "A19D880F-05FC-4D3B-A006-743F0F84911E"),
    ("LINUX_ROOT_X86", "44479540-F297-41B2-9AF7-D131D5F0458A"),
    ("LINUX_ROOT_X86_64", "4F68BCE3-E8CD-4DB1-96E7-FBCAF984B709"),
    ("LINUX_ROOT_ARM64", "B921B045-1DF0-41C3-AF44-4C6F280D3FAE"),
    ("LINUX_SWAP_PARTITION", "0657FD6D-A4AB-43C4-84E5-0933C84B4F4F"),
    ("LINUX_LVM_PARTITION", "E6D6D379-F507-44C2-A23C-238F2A3DF928"),
    ("LINUX_HOME_PARTITION", "933AC7E1-2EB4-4F13-B844-0E14E2AEF915"),
    ("LINUX_SRV_PARTITION", "3B8F8425-20E0-4F3B-907F-1A25A76F98E8"),
    ("LINUX_DM_CRYPT_PARTITION", "7FFEC5C9-2D00-49B7-8941-3EA10A5586B7"),
    ("LINUX_LUKS_PARTITION", "CA7D7CCB-63ED-4C53-861C-1742536059CC"),
    ("LINUX_RESERVED", "8DA63339-0007-60C0-C436-083AC8230908"),
    // FreeBSD
    ("FREEBSD_BOOT_PARTITION", "83BD6B9D-7F41-11DC-BE0B-001560B84F0F"),
    ("FREEBSD_DATA_PARTITION", "516E7CB4-6ECF-11D6-8FF8-00022D09712B"),
    ("FREEBSD_SWAP_PARTITION", "516E7CB5-6ECF-11D6-8FF8-00022D09712B"),
    ("FREEBSD_UFS_PARTITION", "516E7CB6-6ECF-11D6-8FF8-00022D09712B"),
    ("FREEBSD_VINUM_PARTITION", "516E7CB8-6ECF-11D6-8FF8-00022D09712B"),
    ("FREEBSD_ZFS_PARTITION", "516E7CBA-6ECF-11D6-8FF8-00022D09712B"),
    // macOS
    ("APPLE_HFS_PLUS_PARTITION", "48465300-0000-11AA-AA11-00306543ECAC"),
    ("APPLE_APFS_CONTAINER", "7C3457EF-0000-11AA-AA11-00306543ECAC"),
    ("APPLE_UFS_PARTITION", "55465300-0000-11AA-AA11-00306543ECAC"),
    ("APPLE_RAID_PARTITION", "52414944-0000-11AA-AA11-00306543ECAC"),
    ("APPLE_RAID_PARTITION_OFFLINE", "52414944-5F4F-11AA-AA11-00306543ECAC"),
    ("APPLE_BOOT_PARTITION", "426F6F74-0000-11AA-AA11-00306543ECAC"),
    ("APPLE_LABEL", "4C616265-6C00-11AA-AA11-00306543ECAC"),
    ("APPLE_TV_RECOVERY_PARTITION", "5265636F-7665-11AA-AA11-00306543ECAC"),
    ("APPLE_CORE_STORAGE_PARTITION", "53746F72-6167-11AA-AA11-00306543ECAC"),
    // Solaris / illumos
    ("SOLARIS_BOOT_PARTITION", "6A82CB45-1DD2-11B2-99A6-080020736631"),
    ("SOLARIS_ROOT_PARTITION", "6A85CF4D-1DD2-11B2-99A6-080020736631"),
    ("SOLARIS_SWAP_PARTITION", "6A87C46F-1DD2-11B2-99A6-080020736631"),
    ("SOLARIS_BACKUP_PARTITION", "6A8B642B-1DD2-11B2-99A6-080020736631"),
    ("SOLARIS_USR_PARTITION", "6A898CC3-1DD2-11B2-99A6-080020736631"),
    ("SOLARIS_VAR_PARTITION", "6A8EF2E9-1DD2-11B2-99A6-080020736631"),
    ("SOLARIS_HOME_PARTITION", "6A90BA39-1DD2-11B2-99A6-080020736631"),
    // NetBSD / OpenBSD
    ("NETBSD_SWAP_PARTITION", "49F48D32-B10E-11DC-B99B-0019D1879648"),
    ("NETBSD_FFS_PARTITION", "49F48D5A-B10E-11DC-B99B-0019D1879648"),
    ("NETBSD_LFS_PARTITION", "49F48D82-B10E-11DC-B99B-0019D1879648"),
    ("NETBSD_RAID_PARTITION", "49F48DAA-B10E-11DC-B99B-0019D1879648"),
    ("NETBSD_CONCATENATED_PARTITION", "2DB519C4-B10F-11DC-B99B-0019D1879648"),
    ("NETBSD_ENCRYPTED_PARTITION", "2DB519EC-B10F-11DC-B99B-0019D1879648"),
    ("OPENBSD_DATA_PARTITION", "824CC7A0-36A8-11E3-890A-952519AD3F61"),
    // ChromeOS
    ("CHROMEOS_KERNEL", "FE3A2A5D-4F32-41A7-B725-ACCC3285A309"),
    ("CHROMEOS_ROOTFS", "3CB8E202-3B7E-47DD-8A3C-7FF2A13CFCEC"),
    ("CHROMEOS_FUTURE_USE", "2E0A753D-9E48-43B0-8337-B15192CB1B5E"),
    // VMware ESX
    ("VMWARE_VMFS", "AA31E02A-400F-11DB-9590-000C2911D1B8"),
    ("VMWARE_RESERVED", "9198EFFC-31C0-11DB-8F78-000C2911D1B8"),
    ("VMWARE_KCORE_CRASH_PROTECTION", "9D275380-40AD-11DB-BF97-000C2911D1B8"),
    ("CEPH_OSD", "4FBD7E29-9D25-41B8-AFD0-062C0CEFF05D"),
];

/// Symbolic name for a type GUID in on-disk byte order, `UNKNOWN` if unlisted
pub fn lookup(raw: &[u8; 16]) -> &'static str {
    lookup_canonical(&Guid(*raw).canonical())
}

/// Symbolic name for a canonical GUID string (any case)
pub fn lookup_canonical(canonical: &str) -> &'static str {
    GPT_TYPES
        .iter()
        .find(|(_, guid)| guid.eq_ignore_ascii_case(canonical))
        .map_or(super::UNKNOWN, |(name, _)| name)
}

/// Canonical GUID registered under a symbolic name
pub fn guid_of(name: &str) -> Option<&'static str> {
    GPT_TYPES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, guid)| *guid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpt_lookup_by_raw_bytes() {
        let basic_data = [
            0xa2, 0xa0, 0xd0, 0xeb, 0xe5, 0xb9, 0x33, 0x44,
            0x87, 0xc0, 0x68, 0xb6, 0xb7, 0x26, 0x99, 0xc7,
        ];
        assert_eq!(lookup(&basic_data), "MICROSOFT_BASIC_DATA_PARTITION");
        assert_eq!(lookup(&[0; 16]), "UNUSED_ENTRY");
        assert_eq!(lookup(&[0xFF; 16]), "UNKNOWN");
    }

    #[test]
    fn test_gpt_lookup_ignores_case() {
        assert_eq!(
            lookup_canonical("c12a7328-f81f-11d2-ba4b-00a0c93ec93b"),
            "EFI_SYSTEM_PARTITION"
        );
    }

    #[test]
    fn test_registry_guids_reencode() {
        for (name, text) in GPT_TYPES {
            let guid = Guid::parse(text).unwrap();
            assert_eq!(&guid.canonical(), text, "{}", name);
            assert_eq!(lookup(guid.as_bytes()), *name);
        }
    }

    #[test]
    fn test_guid_of() {
        assert_eq!(
            guid_of("LINUX_FILESYSTEM_DATA"),
            Some("0FC63DAF-8483-4772-8E79-3D69D8477DE4")
        );
        assert_eq!(guid_of("NOPE"), None);
    }
}
