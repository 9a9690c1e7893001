//! IBM/MBR system indicator registry

/// `(code, symbolic name, description)` for every known system indicator
static IBM_TYPES: &[(u8, &str, &str)] = &[
    (0x00, "EMPTY", "Empty"),
    (0x01, "DOS_FAT12", "DOS FAT12"),
    (0x02, "XENIX_ROOT", "XENIX root file system"),
    (0x03, "XENIX_USR", "XENIX /usr file system (obsolete)"),
    (0x04, "DOS_FAT16_LT32M", "DOS FAT16 (up to 32M)"),
    (0x05, "DOS_EXTENDED", "DOS 3.3+ extended partition"),
    (0x06, "DOS_FAT16_GT32M", "DOS 3.31+ Large File System (FAT16, over 32M)"),
    (0x07, "NTFS", "NTFS, OS/2 HPFS, Advanced Unix"),
    (0x08, "AIX_BOOTABLE", "AIX bootable partition, SplitDrive"),
    (0x09, "AIX_DATA", "AIX data partition, Coherent filesystem"),
    (0x0A, "OS2_BOOT_MANAGER", "OS/2 Boot Manager, OPUS, Coherent swap partition"),
    (0x0B, "WIN95_FAT32", "Windows 95 FAT Partition"),
    (0x0C, "WIN95_FAT32_LBA", "Windows 95 FAT32 Partition (LBA)"),
    (0x0E, "WIN95_FAT16_LBA", "Windows 95 FAT16 Partition (LBA)"),
    (0x0F, "WIN95_FAT32_EXTENDED", "Windows 95 Extended"),
    (0x10, "OPUS", "OPUS"),
    (0x11, "OS2_BOOT_HIDDEN_12", "OS/2 Boot Manager hidden FAT12 partition"),
    (0x12, "COMPAQ_DIAG", "Compaq Diagnostics partition"),
    (0x14, "OS2_BOOT_HIDDEN_16_S32", "(resulted from using Novell DOS 7.0 FDISK to delete Linux Native part), OS/2 Boot Manager hidden FAT16 (up to 32M) partition"),
    (0x16, "OS2_BOOT_HIDDEN_16_O32", "OS/2 Boot Manager hidden FAT16 (over 32M) partition"),
    (0x17, "OS2_BOOT_HIDDEN_HPFS", "OS/2 Boot Manager hidden HPFS partition"),
    (0x18, "WINDOWS_SWAP", "AST special Windows swap file"),
    (0x19, "WILLOWTECH_PHOTON_COS", "Willowtech Photon coS"),
    (0x1B, "WIN95_FAT32_HIDDEN", "Hidden Windows 95 FAT Partition"),
    (0x1C, "WIN95_FAT32_LBA_HIDDEN", "Hidden Windows 95 FAT32 Partition (LBA)"),
    (0x1E, "WIN95_FAT16_LBA_HIDDEN", "Hidden Windows 95 FAT16 Partition (LBA)"),
    (0x1F, "OS2_MANAGER_HIDDEN_CONTAINER", "OS/2 Boot Manager Hidden Container"),
    (0x20, "WINDOWS_MOBILE_UPDATE", "Windows Mobile update XIP"),
    (0x21, "HP_VOLUME_EXPANSION", "HP Volume Expansion, SpeedStor variant"),
    (0x22, "OXYGEN_EXTENDED_PARTITION_TABLE", "Oxygen Extended Partition Table"),
    (0x23, "WINDOWS_MOBILE_BOOT", "Windows Mobile boot XIP"),
    (0x24, "NEC_MSDOS", "NEC MS-DOS 3.x"),
    (0x25, "WINDOWS_MOBILE_IMGFS", "Windows Mobile IMGFS"),
    (0x27, "WINDOWS_RE_HIDDEN", "Windows Recovery Environment (RE) partition"),
    (0x2A, "ATHFS", "AtheOS File System (AthFS)"),
    (0x2B, "SYLLABLESECURE", "SyllableSecure (SylStor)"),
    (0x32, "NOS", "NOS"),
    (0x35, "OS2_JFS", "OS/2 JFS"),
    (0x38, "THEOS_3_2", "THEOS 3.2"),
    (0x39, "PLAN_9", "Plan 9"),
    (0x3A, "THEOS_4", "THEOS 4"),
    (0x3B, "THEOS_4_EXT", "THEOS 4 extended partition"),
    (0x3C, "POWERQUEST_RECOVERY", "PowerQuest PartitionMagic recovery partition"),
    (0x3D, "HIDDEN_NETWARE", "Hidden NetWare"),
    (0x40, "VENIX80286", "VENIX 80286"),
    (0x41, "PPC_BOOT", "PPC_BOOT"),
    (0x42, "SFS_OR_EXTENDED_PARTITION", "Secure File System, Windows 2000/XP Dynamic extended partition"),
    (0x43, "LINUX_DRDOS", "Linux native shared with DR DOS 6.0"),
    (0x44, "GOBACK", "GoBack partition"),
    (0x45, "PRIAM", "Priam partition"),
    (0x4A, "ADAOS", "AdaOS Aquila"),
    (0x4C, "OBERON", "Oberon partition"),
    (0x4D, "QNX", "QNX"),
    (0x4E, "QNX_SECOND", "QNX second Part"),
    (0x4F, "QNX_THIRD", "QNX third Part"),
    (0x50, "DISK_MANAGER_RO", "Disk Manager, read-only partition"),
    (0x51, "DISK_MANAGER_RW", "Disk Manager, read/write partition"),
    (0x52, "CPM", "CP/M, Microport System V/386"),
    (0x53, "ONTRACK_AUX", "Ontrack Disk Manager"),
    (0x54, "ONTRACK", "Ontrack Disk Manager"),
    (0x55, "EZ_DRIVE", "EZ_DRIVE"),
    (0x56, "VFEATURE", "GoldenBow VFeature"),
    (0x57, "DRIVEPRO", "StorageSoft DrivePro"),
    (0x5C, "PRIAM_EDISK", "Priam Edisk"),
    (0x5D, "APTI_ALT", "APTI alternate partition"),
    (0x61, "SPEEDSTOR", "SpeedStor"),
    (0x63, "UNIX_SYS_V", "Unix SysV/386, 386/ix; ach, MtXinu BSD 4.3 on Mach; GNU HURD"),
    (0x64, "NOVELL", "Novell NetWare"),
    (0x65, "NOVELL_31", "Novell NetWare (3.11)"),
    (0x66, "NOVELL_SMS", "Novell NetWare Storage Management Services (SMS)"),
    (0x67, "NOVELL_WOLF_MOUNTAIN", "Novell Wolf Mountain"),
    (0x68, "NOVELL_ALT", "Novell NetWare"),
    (0x69, "NOVELL_5", "Novell NetWare 5"),
    (0x70, "DISK_SECURE", "DiskSecure Multi-Boot"),
    (0x72, "APTI_ALT_FAT12", "APTI alternate FAT12 partition"),
    (0x74, "SCRAMDISK", "Scramdisk"),
    (0x75, "PC_IX", "PC/IX"),
    (0x77, "M2FS", "M2FS/M2CS partition"),
    (0x78, "XOSL", "XOSL bootloader"),
    (0x79, "APTI_ALT_FAT16", "APTI alternate FAT16 partition"),
    (0x7A, "APTI_ALT_FAT16X", "APTI alternate FAT16X partition"),
    (0x7B, "APTI_ALT_FAT16B", "APTI alternate FAT16B partition"),
    (0x7C, "APTI_ALT_FAT32X", "APTI alternate FAT32X partition"),
    (0x7D, "APTI_ALT_FAT32", "APTI alternate FAT32 partition"),
    (0x7E, "FIX", "FIX"),
    (0x7F, "ALT_OS", "Alternative OS Development Partition Standard"),
    (0x80, "MINIX", "Minix v1.1 - 1.4a"),
    (0x81, "LINUX", "Linux; Mitac Advanced Disk Manager"),
    (0x82, "LINUX_SWAP", "Linux Swap partition"),
    (0x83, "LINUXNATIVE", "Linux native file system (ext2fs/xiafs)"),
    (0x84, "OS2_HIDING_DOS", "OS/2-renumbered type 04h partition (related to hiding DOS C: drive)"),
    (0x85, "LINUX_EXTENDED", "Linux extended partition"),
    (0x86, "WINNT_FAT16B", "Windows NT 4.0 fault tolerant FAT16"),
    (0x87, "WINNT_HPFS_NTFS", "Windows NT 4.0 fault tolerant HPFS/NTFS"),
    (0x88, "LINUX_PLAINTEXT_PARTITION_TABLE", "Linux plaintext partition table"),
    (0x8A, "LINUX_AIRBOOT", "Linux AiR-BOOT"),
    (0x8B, "WINNT_FAT32", "Windows NT 4.0 fault tolerant FAT32"),
    (0x8C, "WINNT_FAT32X", "Windows NT 4.0 fault tolerant FAT32X"),
    (0x8D, "FREEDOS_HIDDEN_FAT12", "FreeDOS hidden FAT12"),
    (0x8E, "LINUX_LVM", "Linux LVM"),
    (0x90, "FREEDOS_HIDDEN_FAT16", "FreeDOS hidden FAT16"),
    (0x91, "FREEDOS_HIDDEN_PART_CHS", "FreeDOS hidden extended partition (CHS addressing)"),
    (0x92, "FREEDOS_HIDDEN_FAT16B", "FreeDOS hidden FAT16B"),
    (0x93, "AMOEBA", "Amoeba file system"),
    (0x94, "AMOEBA_BAD_BLOCK", "Amoeba bad block table"),
    (0x95, "EXOPC", "EXOPC"),
    (0x96, "CHRP", "CHRP ISO-9660"),
    (0x97, "FREEDOS_HIDDEN_FAT32", "FreeDOS hidden FAT32"),
    (0x98, "FREEDOS_HIDDEN_FAT32X", "FreeDOS hidden FAT32X"),
    (0x9A, "FREEDOS_HIDDEN_FAT16X", "FreeDOS hidden FAT16X"),
    (0x9B, "FREEDOS_HIDDEN_EXTENDED_PARTITION", "FreeDOS hidden extended partition"),
    (0x9E, "FORTHOS", "ForthOS"),
    (0x9F, "BSD", "BSD"),
    (0xA0, "THINK_PAD_HIDDEN", "IBM Thinkpad hidden partition"),
    (0xA1, "HP_VOLUME_EXPANSION_A1", "HP Volume Expansion (SpeedStor)"),
    (0xA3, "HP_VOLUME_EXPANSION_A3", "HP Volume Expansion (SpeedStor)"),
    (0xA4, "HP_VOLUME_EXPANSION_A4", "HP Volume Expansion (SpeedStor)"),
    (0xA5, "FREE_BSD", "FreeBSD"),
    (0xA6, "OPEN_BSD", "OpenBSD"),
    (0xA7, "NEXT_STEP", "NextStep"),
    (0xA8, "APPLE_UFS", "Apple UFS"),
    (0xA9, "NETBSD", "NetBSD"),
    (0xAA, "OLIVETTI", "Olivetti FAT12"),
    (0xAB, "APPLE_BOOT", "Apple OSX Boot"),
    (0xAD, "ADFS", "ADFS"),
    (0xAE, "SHAGOS", "ShagOS"),
    (0xAF, "APPLE_HFS_HFSPLUS", "Apple HFS/HFS+"),
    (0xB2, "QNX_NEUTRINO", "QNX Neutrino"),
    (0xB7, "BSDI", "BSDI file system (secondarily swap)"),
    (0xB8, "BSDI_SWAP", "BSDI swap partition (secondarily file system)"),
    (0xBB, "WINNT_FAT32_MIRROR", "Windows NT 4.0 fault tolerant FAT32 mirror"),
    (0xBC, "WINNT_FAT32X_MIRROR", "Windows NT 4.0 fault tolerant FAT32X mirror"),
    (0xBE, "SOLARIS_8_BOOT", "Solaris 8 boot"),
    (0xBF, "SOLARIS_X86", "Solaris x86"),
    (0xC0, "DR_DOS_SECURED_FAT", "DR-DOS secured FAT"),
    (0xC1, "DR_DOS_12", "DR-DOS 6.0 LOGIN.EXE-secured 12-bit FAT partition"),
    (0xC4, "DR_DOS_16", "DR-DOS 6.0 LOGIN.EXE-secured 16-bit FAT partition"),
    (0xC5, "DR_DOS_SECURED_PARTITION_CHS", "DR-DOS secured extended partition CHS"),
    (0xC6, "DR_DOS_HUGE", "DR-DOS 6.0 LOGIN.EXE-secured Huge partition"),
    (0xC7, "CYRNIX", "Cyrnix Boot"),
    (0xCB, "DR_DOS_SECURED_FAT32", "DR-DOS secured FAT32"),
    (0xCC, "DR_DOS_SECURED_FAT32X", "DR-DOS secured FAT32X"),
    (0xCE, "DR_DOS_SECURED_FAT16X", "DR-DOS secured FAT16X"),
    (0xCF, "DR_DOS_SECURED_PARTITION_LBA", "DR-DOS secured extended partition LBA"),
    (0xD0, "NOVELL_DOS_SECURED_FAT", "Novell Multiuser DOS secured FAT"),
    (0xD1, "NOVELL_DOS_SECURED_FAT12", "Novell Multiuser DOS secured FAT12"),
    (0xD4, "NOVELL_DOS_SECURED_FAT16", "Novell Multiuser DOS secured FAT16"),
    (0xD5, "NOVELL_DOS_SECURED_PARTITION_CHS", "Novell Multiuser DOS secured partition CHS"),
    (0xD6, "NOVELL_DOS_SECURED_FAT16B", "Novell Multiuser DOS secured FAT16B"),
    (0xDA, "NON_FS", "Non FS Data"),
    (0xDB, "CPM_DOS", "CP/M, Concurrent CP/M, Concurrent DOS; CTOS (Convergent Technologies OS)"),
    (0xDE, "DELL_UTILITY", "DELL Utility partition"),
    (0xDF, "BOOT_IT", "Boot it"),
    (0xE1, "SPEEDSTOR_FAT_12", "SpeedStor 12-bit FAT extended partition"),
    (0xE2, "DOS_R_O", "Readonly Dos Partition"),
    (0xE3, "DOS_R_O_ALT", "Readonly Dos Partition"),
    (0xE4, "SPEEDSTOR_FAT_16", "SpeedStor 16-bit FAT extended partition"),
    (0xE5, "TANDY_FAT", "Tandy FAT12/16"),
    (0xE8, "LINUX_LUKS", "Linux Unified Key Setup"),
    (0xEB, "BEOS_FS", "BeOS BFS"),
    (0xEC, "SKYFS", "SkyOS SkyFS"),
    (0xED, "EFI_GPT_HYBRID", "EFI GPT hybrid MBR"),
    (0xEE, "EFI_GPT", "EFI GPT protective MBR"),
    (0xEF, "EFI_FAT", "EFI system partition FAT12/16/32"),
    (0xF0, "LINUX_PA_RISK", "Linux PA Risk"),
    (0xF1, "SPEEDSTORE_A", "SpeedStor"),
    (0xF2, "DOS3_3_SECONDARY", "DOS 3.3+ secondary"),
    (0xF4, "SPEEDSTORE_B", "SpeedStor"),
    (0xFB, "VMWARE_VMFS", "VMware VMFS"),
    (0xFC, "VMWARE_SWAP", "VMware swap"),
    (0xFD, "LINUX_RAID", "Linux Raid"),
    (0xFE, "LANSTEP", "LANstep"),
    (0xFF, "XENIX_BAD_BLOCK", "Xenix bad block table"),
];

/// Symbolic name for a system indicator byte, `UNKNOWN` if unlisted
pub fn lookup(code: u8) -> &'static str {
    IBM_TYPES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map_or(super::UNKNOWN, |(_, name, _)| name)
}

/// Human-readable description of a system indicator byte
pub fn describe(code: u8) -> &'static str {
    IBM_TYPES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map_or("Unknown partition type", |(_, _, desc)| desc)
}

/// Does the code mark an extended (EBR chain) container?
pub fn is_extended(code: u8) -> bool {
    matches!(code, 0x05 | 0x0F | 0x85)
}

/// Does the code mark the protective entry of a GPT disk?
pub fn is_gpt_protective(code: u8) -> bool {
    code == 0xEE
}
