//! Size limits and checked arithmetic
//!
//! On-disk headers carry counts and sizes that are used to allocate buffers.
//! Everything derived from such a field goes through these helpers first.

use crate::Error;

/// Bytes read from the start of a device for partition table detection
pub const ZONE_PROBE_SIZE: usize = 16 * 1024;

/// Maximum allocation size for a single buffer (256 MB)
pub const MAX_ALLOCATION_SIZE: usize = 256 * 1024 * 1024;

/// Maximum partition entry count (128 for GPT, padded for safety)
pub const MAX_PARTITION_COUNT: usize = 256;

/// Maximum number of EBRs followed in an extended partition chain
pub const MAX_EBR_CHAIN: usize = 128;

/// Maximum size of a virtual-disk text descriptor (1 MB)
pub const MAX_DESCRIPTOR_SIZE: usize = 1024 * 1024;

/// Maximum file size for memory mapping (16 GB)
pub const MAX_MMAP_SIZE: u64 = 16 * 1024 * 1024 * 1024;

/// Validate that a size is within allocation limits
pub fn validate_allocation_size(size: u64, limit: usize, context: &str) -> crate::Result<usize> {
    if size > limit as u64 {
        return Err(Error::format(format!(
            "{} size {} exceeds limit {}",
            context, size, limit
        )));
    }

    size.try_into()
        .map_err(|_| Error::format(format!("{} size exceeds platform limits", context)))
}

/// Multiply two u64 values, failing on overflow
pub fn checked_multiply_u64(a: u64, b: u64, context: &str) -> crate::Result<u64> {
    a.checked_mul(b)
        .ok_or_else(|| Error::format(format!("{}: multiplication overflow", context)))
}

/// Convert u64 to usize, failing on 32-bit truncation
pub fn u64_to_usize(value: u64, context: &str) -> crate::Result<usize> {
    value.try_into().map_err(|_| {
        Error::format(format!(
            "{}: value {} exceeds platform usize limit",
            context, value
        ))
    })
}
