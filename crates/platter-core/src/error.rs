//! Platter error types

use thiserror::Error;

/// The main error type for Platter operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from the backing storage
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Signature or magic number mismatch, or malformed text
    #[error("Format error: {0}")]
    Format(String),

    /// Sector index outside the valid range
    #[error("Sector {sector} out of bounds (device has {total} sectors)")]
    Bounds {
        /// Offending sector index
        sector: i64,
        /// Number of addressable sectors
        total: u64,
    },

    /// A declared length runs past the available bytes
    #[error("Truncated data: need {needed} bytes at offset {offset}, only {available} available")]
    TruncatedData {
        /// Bytes the record asked for
        needed: usize,
        /// Offset the read started at
        offset: usize,
        /// Bytes actually present from `offset`
        available: usize,
    },

    /// Recognized sub-format that is not implemented
    #[error("Unsupported variant: {0}")]
    UnsupportedVariant(String),

    /// Checksum verification failed
    #[error("Checksum verification failed: {0}")]
    ChecksumVerification(String),

    /// Write to a read-only or no-access target
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Named object (extent file, partition) not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for Platter operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a format error
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Create a bounds error
    pub fn bounds(sector: i64, total: u64) -> Self {
        Error::Bounds { sector, total }
    }

    /// Create a truncated data error
    pub fn truncated(needed: usize, offset: usize, buffer_len: usize) -> Self {
        Error::TruncatedData {
            needed,
            offset,
            available: buffer_len.saturating_sub(offset),
        }
    }

    /// Create an unsupported variant error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedVariant(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Error::PermissionDenied(msg.into())
    }

    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Error::InvalidOperation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// True for errors that describe the data rather than the storage
    ///
    /// Structural errors are raised before any I/O is attempted, so the
    /// device is untouched when one is returned.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::Format(_)
                | Error::Bounds { .. }
                | Error::TruncatedData { .. }
                | Error::UnsupportedVariant(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_reports_available_bytes() {
        let err = Error::truncated(8, 10, 12);
        match err {
            Error::TruncatedData {
                needed,
                offset,
                available,
            } => {
                assert_eq!(needed, 8);
                assert_eq!(offset, 10);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Offset beyond the buffer never underflows
        assert!(matches!(
            Error::truncated(1, 20, 4),
            Error::TruncatedData { available: 0, .. }
        ));
    }

    #[test]
    fn test_structural_classification() {
        assert!(Error::format("bad magic").is_structural());
        assert!(Error::bounds(-1, 10).is_structural());
        assert!(!Error::permission_denied("read-only").is_structural());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        assert!(!Error::from(io).is_structural());
    }

    #[test]
    fn test_bounds_message() {
        let msg = Error::bounds(3000, 3000).to_string();
        assert!(msg.contains("3000"));
        assert!(msg.contains("out of bounds"));
    }
}
