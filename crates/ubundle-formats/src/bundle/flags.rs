//! Archive flags and compression types

use std::fmt;

use super::error::{BundleError, BundleResult};
use super::version::EncryptionMaskPolicy;

/// Archive flags from the UnityFS header
///
/// Bit `0x200` is ambiguous: its meaning depends on the
/// [`EncryptionMaskPolicy`] selected from the engine version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ArchiveFlags(u32);

impl ArchiveFlags {
    /// Compression type of the blocks info
    pub const COMPRESSION_MASK: u32 = 0x3F;
    /// Blocks and directory stored together
    pub const BLOCKS_AND_DIRECTORY_COMBINED: u32 = 0x40;
    /// Blocks info stored at the end of the file
    pub const BLOCKS_INFO_AT_END: u32 = 0x80;
    /// Old web plugin compatibility
    pub const OLD_WEB_PLUGIN_COMPATIBILITY: u32 = 0x100;
    /// Block-info padding at start (modern) or encryption (legacy)
    pub const BLOCK_INFO_NEED_PADDING_AT_START: u32 = 0x200;
    /// Modern encryption bit
    pub const ENCRYPTION: u32 = 0x400;
    /// Modern encryption bit
    pub const ENCRYPTION_EXTRA: u32 = 0x1000;

    /// Wrap a raw flags value
    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw value
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether any of `mask` is set
    pub fn contains_any(self, mask: u32) -> bool {
        self.0 & mask != 0
    }

    /// Raw compression value (`flags & 0x3F`)
    pub fn compression_bits(self) -> u32 {
        self.0 & Self::COMPRESSION_MASK
    }

    /// Blocks info is stored at the end of the file
    pub fn blocks_info_at_end(self) -> bool {
        self.contains_any(Self::BLOCKS_INFO_AT_END)
    }

    /// Old web plugin compatibility layout
    pub fn old_web_plugin_compatibility(self) -> bool {
        self.contains_any(Self::OLD_WEB_PLUGIN_COMPATIBILITY)
    }

    /// Blocks and directory stored together
    pub fn blocks_and_directory_combined(self) -> bool {
        self.contains_any(Self::BLOCKS_AND_DIRECTORY_COMBINED)
    }

    /// Container is UnityCN encrypted under `policy`
    pub fn is_encrypted(self, policy: EncryptionMaskPolicy) -> bool {
        self.contains_any(policy.encryption_mask())
    }

    /// Blocks info is followed by padding to 16 bytes under `policy`
    pub fn block_info_need_padding_at_start(self, policy: EncryptionMaskPolicy) -> bool {
        policy.has_block_info_padding_bit()
            && self.contains_any(Self::BLOCK_INFO_NEED_PADDING_AT_START)
    }

    /// Replace the compression bits
    pub fn with_compression(self, compression: CompressionType) -> Self {
        Self((self.0 & !Self::COMPRESSION_MASK) | compression.as_bits())
    }
}

impl From<u32> for ArchiveFlags {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Display for ArchiveFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Compression used by the blocks info and by individual storage blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CompressionType {
    /// Stored
    None = 0,
    /// LZMA1 with a 5-byte properties header and no size field
    Lzma = 1,
    /// LZ4 block
    Lz4 = 2,
    /// LZ4 block, high compression
    Lz4Hc = 3,
    /// LZHAM, recognised but not supported
    Lzham = 4,
}

impl CompressionType {
    /// Parse from the low 6 bits of a flags value
    pub fn from_bits(bits: u32) -> BundleResult<Self> {
        match bits & ArchiveFlags::COMPRESSION_MASK {
            0 => Ok(Self::None),
            1 => Ok(Self::Lzma),
            2 => Ok(Self::Lz4),
            3 => Ok(Self::Lz4Hc),
            4 => Ok(Self::Lzham),
            other => Err(BundleError::UnknownCompression(other)),
        }
    }

    /// Numeric value
    pub fn as_bits(self) -> u32 {
        self as u32
    }

    /// Short name
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lzma => "lzma",
            Self::Lz4 => "lz4",
            Self::Lz4Hc => "lz4hc",
            Self::Lzham => "lzham",
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
