//! Text descriptor of a virtual disk
//!
//! ```text
//! # Disk DescriptorFile
//! version=1
//! CID=fffffffe
//! parentCID=ffffffff
//! createType="twoGbMaxExtentFlat"
//!
//! # Extent description
//! RW 4192256 FLAT "disk-f001.vmdk" 0
//! RW 2101248 FLAT "disk-f002.vmdk" 0
//!
//! # The Disk Data Base
//! ddb.geometry.cylinders = "390"
//! ddb.geometry.heads = "255"
//! ddb.geometry.sectors = "63"
//! ```
//!
//! Lines are trimmed; blank lines and `#` comments are skipped. A line that
//! starts with an access mode is an extent; anything else must be
//! `key = value`, split at the first `=`, with surrounding quotes removed.

use super::extent::{parse_number, Access, ExtentDeclaration};
use platter_core::{Error, Result, MAX_DESCRIPTOR_SIZE, SECTOR_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Magic comment that opens a standalone descriptor file
pub const DESCRIPTOR_MARKER: &str = "# Disk DescriptorFile";

/// CHS geometry from the disk database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub cylinders: u64,
    pub heads: u64,
    pub sectors_per_track: u64,
}

impl Geometry {
    /// Sectors addressable through this geometry, `None` on overflow
    pub fn total_sectors(&self) -> Option<u64> {
        self.cylinders
            .checked_mul(self.heads)?
            .checked_mul(self.sectors_per_track)
    }
}

/// Header keys of a descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorHeader {
    pub version: Option<u32>,
    /// Content ID, written in hex
    pub cid: Option<u32>,
    /// Content ID of the parent link, `0xFFFFFFFF` when there is none
    pub parent_cid: Option<u32>,
    pub create_type: Option<String>,
}

impl DescriptorHeader {
    pub const NO_PARENT: u32 = 0xFFFF_FFFF;

    pub fn has_parent(&self) -> bool {
        self.parent_cid.map_or(false, |cid| cid != Self::NO_PARENT)
    }
}

/// Parsed descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub header: DescriptorHeader,
    /// Extents in address order
    pub extents: Vec<ExtentDeclaration>,
    pub geometry: Option<Geometry>,
    /// `ddb.*` entries, key without the prefix
    pub ddb: BTreeMap<String, String>,
    /// Remaining header keys (encoding, parentFileNameHint, ...)
    pub properties: BTreeMap<String, String>,
}

impl Descriptor {
    /// Parse descriptor text
    ///
    /// # Errors
    ///
    /// Format error on a malformed extent line, a non-numeric header or
    /// geometry value, a line that is neither an extent nor `key = value`,
    /// a descriptor without extents, or a geometry larger than the extents.
    pub fn parse(text: &str) -> Result<Self> {
        let mut header = DescriptorHeader::default();
        let mut extents = Vec::new();
        let mut ddb = BTreeMap::new();
        let mut properties = BTreeMap::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if is_extent_line(line) {
                extents.push(ExtentDeclaration::parse(line)?);
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::format(format!(
                    "Descriptor line {}: expected extent or key=value, got '{}'",
                    line_no + 1,
                    line
                )));
            };
            let key = key.trim();
            let value = unquote(value.trim());

            match key {
                "version" => header.version = Some(parse_u32(value, key)?),
                "CID" => header.cid = Some(parse_hex(value, key)?),
                "parentCID" => header.parent_cid = Some(parse_hex(value, key)?),
                "createType" => header.create_type = Some(value.to_string()),
                _ => {
                    if let Some(db_key) = key.strip_prefix("ddb.") {
                        ddb.insert(db_key.to_string(), value.to_string());
                    } else {
                        properties.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }

        if extents.is_empty() {
            return Err(Error::format("Descriptor declares no extents"));
        }

        let geometry = parse_geometry(&ddb)?;
        let descriptor = Self {
            header,
            extents,
            geometry,
            ddb,
            properties,
        };

        let total = descriptor.checked_total_sectors()?;
        if let Some(geometry) = &descriptor.geometry {
            let declared = geometry
                .total_sectors()
                .ok_or_else(|| Error::format("Geometry overflows 64 bits"))?;
            // Cylinder counts are rounded down, so the geometry may cover less than the extents
            if declared > total {
                return Err(Error::format(format!(
                    "Geometry declares {} sectors but extents provide {}",
                    declared, total
                )));
            }
            if declared < total {
                tracing::warn!(
                    geometry_sectors = declared,
                    extent_sectors = total,
                    "geometry covers fewer sectors than the extents"
                );
            }
        }

        tracing::debug!(
            extents = descriptor.extents.len(),
            total_sectors = total,
            create_type = descriptor.header.create_type.as_deref().unwrap_or("-"),
            "parsed virtual disk descriptor"
        );
        Ok(descriptor)
    }

    /// Parse descriptor bytes, as read from a file or a sparse extent
    ///
    /// Trailing NUL padding is ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() > MAX_DESCRIPTOR_SIZE {
            return Err(Error::format(format!(
                "Descriptor of {} bytes exceeds the {} byte limit",
                data.len(),
                MAX_DESCRIPTOR_SIZE
            )));
        }
        let end = data.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
        let text = std::str::from_utf8(&data[..end])
            .map_err(|e| Error::format(format!("Descriptor is not UTF-8 text: {}", e)))?;
        Self::parse(text)
    }

    /// Sum of all extent sizes
    pub fn total_sectors(&self) -> u64 {
        self.extents.iter().map(|e| e.size_in_sectors).sum()
    }

    /// Total size in bytes
    pub fn length(&self) -> u64 {
        self.total_sectors().saturating_mul(SECTOR_SIZE as u64)
    }

    /// Does the geometry address exactly the sectors the extents provide?
    ///
    /// `true` when the descriptor has no geometry.
    pub fn geometry_consistent(&self) -> bool {
        match &self.geometry {
            Some(geometry) => geometry.total_sectors() == Some(self.total_sectors()),
            None => true,
        }
    }

    /// Require the geometry to match the extents exactly
    ///
    /// # Errors
    ///
    /// `Format` when C×H×S differs from the sum of the extent sizes.
    pub fn verify(&self) -> Result<()> {
        if self.geometry_consistent() {
            return Ok(());
        }
        let declared = self.geometry.and_then(|g| g.total_sectors());
        Err(Error::format(format!(
            "Geometry declares {} sectors but extents provide {}",
            declared.map_or_else(|| "overflowing".to_string(), |d| d.to_string()),
            self.total_sectors()
        )))
    }

    /// Disk adapter from the disk database (ide, lsilogic, buslogic, ...)
    pub fn adapter_type(&self) -> Option<&str> {
        self.ddb.get("adapterType").map(String::as_str)
    }

    fn checked_total_sectors(&self) -> Result<u64> {
        self.extents.iter().try_fold(0u64, |acc, e| {
            acc.checked_add(e.size_in_sectors)
                .ok_or_else(|| Error::format("Extent sizes overflow 64 bits"))
        })
    }

    /// Render back to descriptor text
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(DESCRIPTOR_MARKER);
        out.push('\n');
        if let Some(version) = self.header.version {
            out.push_str(&format!("version={}\n", version));
        }
        if let Some(cid) = self.header.cid {
            out.push_str(&format!("CID={:08x}\n", cid));
        }
        if let Some(cid) = self.header.parent_cid {
            out.push_str(&format!("parentCID={:08x}\n", cid));
        }
        if let Some(create_type) = &self.header.create_type {
            out.push_str(&format!("createType=\"{}\"\n", create_type));
        }
        for (key, value) in &self.properties {
            out.push_str(&format!("{}=\"{}\"\n", key, value));
        }
        out.push_str("\n# Extent description\n");
        for extent in &self.extents {
            out.push_str(&extent.to_string());
            out.push('\n');
        }
        out.push_str("\n# The Disk Data Base\n");
        for (key, value) in &self.ddb {
            out.push_str(&format!("ddb.{} = \"{}\"\n", key, value));
        }
        out
    }
}

fn is_extent_line(line: &str) -> bool {
    let first = line.split_whitespace().next().unwrap_or("");
    first.parse::<Access>().is_ok()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_u32(value: &str, key: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| Error::format(format!("Invalid {} '{}'", key, value)))
}

fn parse_hex(value: &str, key: &str) -> Result<u32> {
    u32::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|_| Error::format(format!("Invalid {} '{}'", key, value)))
}

fn parse_geometry(ddb: &BTreeMap<String, String>) -> Result<Option<Geometry>> {
    let field = |name: &str| -> Result<Option<u64>> {
        ddb.get(name)
            .map(|v| parse_number(v, name))
            .transpose()
    };

    let cylinders = field("geometry.cylinders")?;
    let heads = field("geometry.heads")?;
    let sectors = field("geometry.sectors")?;

    Ok(match (cylinders, heads, sectors) {
        (Some(cylinders), Some(heads), Some(sectors_per_track)) => Some(Geometry {
            cylinders,
            heads,
            sectors_per_track,
        }),
        (None, None, None) => None,
        _ => {
            tracing::warn!("incomplete geometry in disk database, ignoring it");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdisk::extent::ExtentKind;

    const SAMPLE: &str = r#"# Disk DescriptorFile
version=1
encoding="UTF-8"
CID=fffffffe
parentCID=ffffffff
createType="twoGbMaxExtentFlat"

# Extent description
RW 1000 FLAT "disk-f001.vmdk" 0
RDONLY 2000 FLAT "disk-f002.vmdk" 0

# The Disk Data Base
#DDB

ddb.adapterType = "ide"
ddb.geometry.cylinders = "2"
ddb.geometry.heads = "16"
ddb.geometry.sectors = "63"
"#;

    #[test]
    fn test_parse_sample() {
        let d = Descriptor::parse(SAMPLE).unwrap();

        assert_eq!(d.header.version, Some(1));
        assert_eq!(d.header.cid, Some(0xFFFF_FFFE));
        assert!(!d.header.has_parent());
        assert_eq!(d.header.create_type.as_deref(), Some("twoGbMaxExtentFlat"));
        assert_eq!(d.properties.get("encoding").map(String::as_str), Some("UTF-8"));

        assert_eq!(d.extents.len(), 2);
        assert_eq!(d.extents[1].access, Access::ReadOnly);
        assert_eq!(d.extents[1].kind, ExtentKind::Flat);
        assert_eq!(d.total_sectors(), 3000);
        assert_eq!(d.length(), 3000 * 512);

        assert_eq!(d.adapter_type(), Some("ide"));
        assert_eq!(
            d.geometry,
            Some(Geometry {
                cylinders: 2,
                heads: 16,
                sectors_per_track: 63
            })
        );
    }

    #[test]
    fn test_geometry_matching_extents() {
        let text = "RW 1008 FLAT \"a.vmdk\"\nddb.geometry.cylinders=\"1\"\n\
                    ddb.geometry.heads=\"16\"\nddb.geometry.sectors=\"63\"\n";
        let d = Descriptor::parse(text).unwrap();
        assert_eq!(d.geometry.and_then(|g| g.total_sectors()), Some(d.total_sectors()));
        assert!(d.geometry_consistent());
        assert!(d.verify().is_ok());
    }

    #[test]
    fn test_geometry_smaller_than_extents_flagged() {
        let text = "RW 2000 FLAT \"a.vmdk\"\nddb.geometry.cylinders=\"1\"\n\
                    ddb.geometry.heads=\"16\"\nddb.geometry.sectors=\"63\"\n";
        let d = Descriptor::parse(text).unwrap();
        assert_eq!(d.geometry.and_then(|g| g.total_sectors()), Some(1008));
        assert_eq!(d.total_sectors(), 2000);
        assert!(!d.geometry_consistent());
        assert!(matches!(d.verify(), Err(Error::Format(_))));
    }

    #[test]
    fn test_no_geometry_is_consistent() {
        let d = Descriptor::parse("RW 10 ZERO\n").unwrap();
        assert!(d.geometry.is_none());
        assert!(d.geometry_consistent());
        assert!(d.verify().is_ok());
    }

    #[test]
    fn test_geometry_larger_than_extents_rejected() {
        let text = "RW 100 FLAT \"a.vmdk\"\nddb.geometry.cylinders=\"10\"\n\
                    ddb.geometry.heads=\"16\"\nddb.geometry.sectors=\"63\"\n";
        assert!(matches!(Descriptor::parse(text), Err(Error::Format(_))));
    }

    #[test]
    fn test_bad_numbers_reject_descriptor() {
        let bad_size = "RW 10O0 FLAT \"a.vmdk\"\n";
        let bad_version = "version=one\nRW 1000 FLAT \"a.vmdk\"\n";
        let bad_cid = "CID=xyz\nRW 1000 FLAT \"a.vmdk\"\n";
        let bad_geometry = "RW 1000 FLAT \"a.vmdk\"\nddb.geometry.heads=\"many\"\n";
        for text in [bad_size, bad_version, bad_cid, bad_geometry] {
            assert!(matches!(Descriptor::parse(text), Err(Error::Format(_))), "{}", text);
        }
    }

    #[test]
    fn test_unknown_kind_rejects_descriptor() {
        let text = "RW 1000 FLAT \"a.vmdk\"\nRW 1000 TAPE \"b.vmdk\"\n";
        assert!(matches!(Descriptor::parse(text), Err(Error::Format(_))));
    }

    #[test]
    fn test_garbage_line_rejected() {
        assert!(Descriptor::parse("RW 1000 FLAT \"a.vmdk\"\nhello world\n").is_err());
    }

    #[test]
    fn test_no_extents_rejected() {
        assert!(Descriptor::parse("# Disk DescriptorFile\nversion=1\n").is_err());
    }

    #[test]
    fn test_from_bytes_strips_padding() {
        let mut data = b"RW 64 ZERO\n".to_vec();
        data.resize(1024, 0);
        assert_eq!(Descriptor::from_bytes(&data).unwrap().total_sectors(), 64);
    }

    #[test]
    fn test_to_text_reparses() {
        let d = Descriptor::parse(SAMPLE).unwrap();
        let again = Descriptor::parse(&d.to_text()).unwrap();
        assert_eq!(again, d);
    }
}
