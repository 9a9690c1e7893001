//! Mixed-endian GUIDs as stored in GPT structures

use platter_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A 16-byte GUID in on-disk byte order
///
/// The first three groups are little-endian, the last two are stored as-is,
/// so the canonical text form is
/// `b3b2b1b0-b5b4-b7b6-b8b9-b10b11b12b13b14b15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// The all-zero GUID marking an unused GPT entry
    pub const ZERO: Self = Self([0; 16]);

    /// Wrap raw on-disk bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw on-disk bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 16]
    }

    /// Canonical upper-case text form
    pub fn canonical(&self) -> String {
        let b = &self.0;
        format!(
            "{:02X}{:02X}{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6],
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }

    /// The same identifier as a `Uuid` (big-endian field order)
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes_le(self.0)
    }

    /// Encode a `Uuid` back into on-disk order
    pub fn from_uuid(uuid: &Uuid) -> Self {
        Self(uuid.to_bytes_le())
    }

    /// Parse a canonical (case-insensitive) GUID string into on-disk order
    pub fn parse(text: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(text)
            .map_err(|e| Error::format(format!("Invalid GUID '{}': {}", text, e)))?;
        Ok(Self::from_uuid(&uuid))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Microsoft basic data as it appears in a GPT entry
    const BASIC_DATA: [u8; 16] = [
        0xa2, 0xa0, 0xd0, 0xeb, 0xe5, 0xb9, 0x33, 0x44,
        0x87, 0xc0, 0x68, 0xb6, 0xb7, 0x26, 0x99, 0xc7,
    ];

    #[test]
    fn test_canonical_form() {
        assert_eq!(
            Guid(BASIC_DATA).canonical(),
            "EBD0A0A2-B9E5-4433-87C0-68B6B72699C7"
        );
        assert_eq!(
            Guid::ZERO.to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_canonical_matches_uuid() {
        let guid = Guid(BASIC_DATA);
        assert_eq!(
            guid.to_uuid().hyphenated().to_string().to_uppercase(),
            guid.canonical()
        );
    }

    #[test]
    fn test_reencode_reproduces_layout() {
        let guid = Guid::parse("ebd0a0a2-b9e5-4433-87c0-68b6b72699c7").unwrap();
        assert_eq!(guid.as_bytes(), &BASIC_DATA);

        let again = Guid::parse(&guid.canonical()).unwrap();
        assert_eq!(again, guid);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Guid::parse("not-a-guid"), Err(Error::Format(_))));
    }
}
