//! Extent declarations from a virtual-disk descriptor

use platter_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Access mode of an extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    #[serde(rename = "RW")]
    ReadWrite,
    #[serde(rename = "RDONLY")]
    ReadOnly,
    #[serde(rename = "NOACCESS")]
    NoAccess,
}

impl Access {
    pub fn token(&self) -> &'static str {
        match self {
            Self::ReadWrite => "RW",
            Self::ReadOnly => "RDONLY",
            Self::NoAccess => "NOACCESS",
        }
    }

    pub fn can_read(&self) -> bool {
        !matches!(self, Self::NoAccess)
    }

    pub fn can_write(&self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

impl FromStr for Access {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RW" => Ok(Self::ReadWrite),
            "RDONLY" => Ok(Self::ReadOnly),
            "NOACCESS" => Ok(Self::NoAccess),
            other => Err(Error::format(format!("Unknown extent access mode '{}'", other))),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// How an extent stores its sectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExtentKind {
    /// Sectors stored contiguously in the backing file
    Flat,
    /// Hosted sparse file with grain directory and grain tables
    Sparse,
    /// No backing file, reads as zeros
    Zero,
    /// Flat extent on a VMFS volume
    Vmfs,
    /// Sparse extent on a VMFS volume
    VmfsSparse,
    /// Raw device mapping
    VmfsRdm,
    /// Raw device on a VMFS host
    VmfsRaw,
}

impl ExtentKind {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Flat => "FLAT",
            Self::Sparse => "SPARSE",
            Self::Zero => "ZERO",
            Self::Vmfs => "VMFS",
            Self::VmfsSparse => "VMFSSPARSE",
            Self::VmfsRdm => "VMFSRDM",
            Self::VmfsRaw => "VMFSRAW",
        }
    }

    /// Does this kind read from a backing file?
    pub fn has_backing_file(&self) -> bool {
        !matches!(self, Self::Zero)
    }

    /// Fails with `UnsupportedVariant` for kinds without an I/O backend
    pub fn check_supported(&self) -> Result<()> {
        match self {
            Self::VmfsSparse | Self::VmfsRdm | Self::VmfsRaw => {
                Err(Error::unsupported(format!("{} extents are not supported", self)))
            }
            _ => Ok(()),
        }
    }

    /// Fails unless sectors of this kind can be written
    ///
    /// `ZERO` extents are `PermissionDenied`, unsupported kinds are
    /// `UnsupportedVariant`.
    pub fn check_writable(&self) -> Result<()> {
        self.check_supported()?;
        if *self == Self::Zero {
            return Err(Error::permission_denied("ZERO extents cannot be written"));
        }
        Ok(())
    }
}

impl FromStr for ExtentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FLAT" => Ok(Self::Flat),
            "SPARSE" => Ok(Self::Sparse),
            "ZERO" => Ok(Self::Zero),
            "VMFS" => Ok(Self::Vmfs),
            "VMFSSPARSE" => Ok(Self::VmfsSparse),
            "VMFSRDM" => Ok(Self::VmfsRdm),
            "VMFSRAW" => Ok(Self::VmfsRaw),
            other => Err(Error::format(format!("Unknown extent kind '{}'", other))),
        }
    }
}

impl fmt::Display for ExtentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One extent line of a descriptor
///
/// `<access> <size> <kind> "<file>" [offset]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtentDeclaration {
    pub access: Access,
    pub size_in_sectors: u64,
    pub kind: ExtentKind,
    /// Backing file name as written in the descriptor (absent for ZERO)
    pub file_name: Option<String>,
    /// Sector offset of the extent data inside the backing file
    pub offset: u64,
}

impl ExtentDeclaration {
    /// Parse one extent line
    ///
    /// # Errors
    ///
    /// Format error on an unknown access mode or kind, a non-numeric size or
    /// offset, a missing or unterminated file name, or trailing tokens.
    pub fn parse(line: &str) -> Result<Self> {
        let mut rest = line.trim();

        let mut next_token = |rest: &mut &str| -> Option<String> {
            let trimmed = rest.trim_start();
            if trimmed.is_empty() {
                return None;
            }
            let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
            let token = trimmed[..end].to_string();
            *rest = &trimmed[end..];
            Some(token)
        };

        let access: Access = next_token(&mut rest)
            .ok_or_else(|| Error::format("Empty extent line"))?
            .parse()?;
        let size_in_sectors = parse_number(
            &next_token(&mut rest).ok_or_else(|| Error::format("Extent line without size"))?,
            "extent size",
        )?;
        let kind: ExtentKind = next_token(&mut rest)
            .ok_or_else(|| Error::format("Extent line without kind"))?
            .parse()?;

        let remainder = rest.trim_start();
        let (file_name, after_name) = if let Some(quoted) = remainder.strip_prefix('"') {
            let close = quoted
                .find('"')
                .ok_or_else(|| Error::format(format!("Unterminated file name in '{}'", line)))?;
            (Some(quoted[..close].to_string()), &quoted[close + 1..])
        } else if remainder.is_empty() && !kind.has_backing_file() {
            (None, remainder)
        } else {
            return Err(Error::format(format!("Extent line without file name: '{}'", line)));
        };

        let mut tail = after_name;
        let offset = match next_token(&mut tail) {
            Some(token) => parse_number(&token, "extent offset")?,
            None => 0,
        };
        if let Some(extra) = next_token(&mut tail) {
            return Err(Error::format(format!("Unexpected token '{}' in extent line", extra)));
        }

        Ok(Self {
            access,
            size_in_sectors,
            kind,
            file_name,
            offset,
        })
    }

    /// Backing file resolved against the descriptor's directory
    pub fn resolve(&self, base_dir: &Path) -> Option<PathBuf> {
        self.file_name.as_ref().map(|name| base_dir.join(name))
    }
}

impl fmt::Display for ExtentDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.access, self.size_in_sectors, self.kind)?;
        if let Some(name) = &self.file_name {
            write!(f, " \"{}\"", name)?;
            if self.offset != 0 {
                write!(f, " {}", self.offset)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn parse_number(token: &str, what: &str) -> Result<u64> {
    token
        .parse::<u64>()
        .map_err(|_| Error::format(format!("Invalid {} '{}'", what, token)))
}
