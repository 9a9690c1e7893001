//! Partition type registries
//!
//! Flat `(name, code)` tables, one per partition scheme. Every lookup is
//! total: a code nobody registered resolves to [`UNKNOWN`].

pub mod apm;
pub mod gpt;
pub mod ibm;

use platter_core::PartitionTypeCode;
use serde::Serialize;
use std::fmt;

/// Name returned for codes missing from a registry
pub const UNKNOWN: &str = "UNKNOWN";

/// A type code bound to its symbolic name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionType {
    pub name: &'static str,
    pub code: PartitionTypeCode,
}

impl PartitionType {
    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Resolve any raw type code against the matching registry
pub fn lookup(code: &PartitionTypeCode) -> PartitionType {
    let name = match code {
        PartitionTypeCode::Byte(b) => ibm::lookup(*b),
        PartitionTypeCode::Guid(g) => gpt::lookup(g),
        PartitionTypeCode::Ascii(s) => apm::lookup(s),
    };
    PartitionType {
        name,
        code: code.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_dispatches_by_code_kind() {
        assert_eq!(lookup(&PartitionTypeCode::Byte(0x0C)).name, "WIN95_FAT32_LBA");
        assert_eq!(lookup(&PartitionTypeCode::Guid([0; 16])).name, "UNUSED_ENTRY");
        assert_eq!(
            lookup(&PartitionTypeCode::Ascii("Apple_HFS".into())).name,
            "APPLE_HFS"
        );
    }

    #[test]
    fn test_lookup_never_fails() {
        let t = lookup(&PartitionTypeCode::Ascii("???".into()));
        assert!(t.is_unknown());
        assert_eq!(t.to_string(), "UNKNOWN (???)");
    }
}
