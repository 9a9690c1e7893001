//! Apple partition map type string registry

/// `(symbolic name, on-disk type string)`
static APM_TYPES: &[(&str, &str)] = &[
    ("APPLE_PARTITION_MAP", "Apple_partition_map"),
    ("APPLE_DRIVER", "Apple_Driver"),
    ("APPLE_DRIVER43", "Apple_Driver43"),
    ("APPLE_DRIVER43_CD", "Apple_Driver43_CD"),
    ("APPLE_DRIVER_ATA", "Apple_Driver_ATA"),
    ("APPLE_DRIVER_ATAPI", "Apple_Driver_ATAPI"),
    ("APPLE_DRIVER_IOKIT", "Apple_Driver_IOKit"),
    ("APPLE_FWDRIVER", "Apple_FWDriver"),
    ("APPLE_PATCHES", "Apple_Patches"),
    ("APPLE_HFS", "Apple_HFS"),
    ("APPLE_HFSX", "Apple_HFSX"),
    ("APPLE_MFS", "Apple_MFS"),
    ("APPLE_UFS", "Apple_UFS"),
    ("APPLE_PRODOS", "Apple_PRODOS"),
    ("APPLE_BOOT", "Apple_Boot"),
    ("APPLE_BOOT_RAID", "Apple_Boot_RAID"),
    ("APPLE_BOOTSTRAP", "Apple_Bootstrap"),
    ("APPLE_LOADER", "Apple_Loader"),
    ("APPLE_RAID", "Apple_RAID"),
    ("APPLE_RAID_OFFLINE", "Apple_RAID_Offline"),
    ("APPLE_CORE_STORAGE", "Apple_CoreStorage"),
    ("APPLE_APFS", "Apple_APFS"),
    ("APPLE_RHAPSODY_UFS", "Apple_Rhapsody_UFS"),
    ("APPLE_UNIX_SVR2", "Apple_Unix_SVR2"),
    ("APPLE_FREE", "Apple_Free"),
    ("APPLE_SCRATCH", "Apple_Scratch"),
    ("APPLE_VOID", "Apple_Void"),
    ("APPLE_EXTRA", "Apple_Extra"),
    ("BE_BFS", "Be_BFS"),
    ("CD_PARTITION_SCHEME", "CD_partition_scheme"),
    ("LINUX", "Linux"),
    ("LINUX_SWAP", "Linux_swap"),
];

/// Symbolic name for an APM type string, `UNKNOWN` if unlisted
pub fn lookup(type_string: &str) -> &'static str {
    APM_TYPES
        .iter()
        .find(|(_, s)| *s == type_string)
        .map_or(super::UNKNOWN, |(name, _)| name)
}
