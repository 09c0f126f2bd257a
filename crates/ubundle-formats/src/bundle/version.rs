//! Engine version strings and the encryption-mask policy they select

use std::fmt;

/// Engine version as an ordered tuple of integers
///
/// Every maximal run of non-digit characters separates two components, so
/// `"2019.4.2f1"` parses to `[2019, 4, 2, 1]`. Missing components read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EngineVersion(Vec<u32>);

impl EngineVersion {
    /// Parse an engine version string
    ///
    /// Components that do not fit in a `u32` saturate.
    pub fn parse(version: &str) -> Self {
        let components = version
            .split(|c: char| !c.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse().unwrap_or(u32::MAX))
            .collect();
        Self(components)
    }

    /// All parsed components
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Component at `index`, 0 when absent
    pub fn component(&self, index: usize) -> u32 {
        self.0.get(index).copied().unwrap_or(0)
    }

    /// Major version (e.g. 2019)
    pub fn major(&self) -> u32 {
        self.component(0)
    }

    /// Minor version
    pub fn minor(&self) -> u32 {
        self.component(1)
    }

    /// Patch version
    pub fn patch(&self) -> u32 {
        self.component(2)
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<&str> for EngineVersion {
    fn from(version: &str) -> Self {
        Self::parse(version)
    }
}

/// Which historical meaning the archive flag bits carry
///
/// Engine builds up to 2020.3.34, 2021.3.2 and 2022.3.1 mark UnityCN
/// encryption with bit `0x200`. Later builds moved it to `0x400 | 0x1000` and
/// reuse `0x200` for "block-info padding at start".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionMaskPolicy {
    /// Older builds: `0x200` means encrypted
    Legacy,
    /// Newer builds: `0x1400` means encrypted, `0x200` means padding
    Modern,
}

impl EncryptionMaskPolicy {
    /// Encrypted bit under the legacy interpretation
    pub const LEGACY_ENCRYPTION_MASK: u32 = 0x200;
    /// Encrypted bits under the modern interpretation
    pub const MODERN_ENCRYPTION_MASK: u32 = 0x400 | 0x1000;

    /// Choose the policy for an engine version
    pub fn for_version(version: &EngineVersion) -> Self {
        let minor_patch = (version.minor(), version.patch());
        let legacy = match version.major() {
            major if major < 2020 => true,
            2020 => minor_patch <= (3, 34),
            2021 => minor_patch <= (3, 2),
            2022 => minor_patch <= (3, 1),
            _ => false,
        };
        if legacy { Self::Legacy } else { Self::Modern }
    }

    /// Archive flag bits that mark the container as encrypted
    pub fn encryption_mask(self) -> u32 {
        match self {
            Self::Legacy => Self::LEGACY_ENCRYPTION_MASK,
            Self::Modern => Self::MODERN_ENCRYPTION_MASK,
        }
    }

    /// Whether `0x200` means "block-info padding at start" under this policy
    pub fn has_block_info_padding_bit(self) -> bool {
        matches!(self, Self::Modern)
    }
}

impl fmt::Display for EncryptionMaskPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Modern => f.write_str("modern"),
        }
    }
}
