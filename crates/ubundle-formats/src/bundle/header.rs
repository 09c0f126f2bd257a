//! UnityFS header and the offset calculus
//!
//! The header is always big-endian, whatever endianness the caller passes.
//!
//! ```text
//! signature        null-terminated ("UnityFS")
//! version          u32
//! generation       null-terminated ("5.x.x")
//! engine           null-terminated ("2019.4.2f1")
//! total_file_size  i64
//! compressed       u32   blocks info, as stored
//! decompressed     u32   blocks info, decompressed
//! flags            u32   ArchiveFlags
//! ```

use binrw::io::{Read, Seek, SeekFrom, Write};
use binrw::{BinRead, BinResult, BinWrite, NullString};
use tracing::trace;

use super::error::{BundleError, BundleResult};
use super::flags::{ArchiveFlags, CompressionType};
use super::version::{EncryptionMaskPolicy, EngineVersion};
use ubundle_crypto::UNITY_CN_HEADER_SIZE;

/// The only supported container signature
pub const UNITY_FS_SIGNATURE: &str = "UnityFS";

/// Fixed bytes of the header besides the three strings: version, the string
/// terminators for generation and engine, and the 20-byte sub-header
const HEADER_PREFIX_SIZE: i64 = 0x1A;

/// Replaces the signature term under old web plugin compatibility
const OLD_WEB_PLUGIN_SIZE: i64 = 0x0A;

/// Round `value` up to the next multiple of 16
pub(crate) fn align16(value: i64) -> i64 {
    (value + 15) & !15
}

/// UnityFS sub-header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct FsHeader {
    /// Total file size, 0 when unknown
    pub total_file_size: i64,
    /// Size of the blocks info as stored
    pub compressed_size: u32,
    /// Size of the blocks info after decompression
    pub decompressed_size: u32,
    /// Archive flags
    #[br(map = ArchiveFlags::new)]
    #[bw(map = |flags: &ArchiveFlags| flags.bits())]
    pub flags: ArchiveFlags,
}

/// Parsed UnityFS header
///
/// Immutable once parsed. The encryption policy and the alignment decision are
/// made once, at parse (or construction) time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleHeader {
    signature: String,
    version: u32,
    generation_version: String,
    engine_version: String,
    parsed_engine_version: EngineVersion,
    align_after_header: bool,
    policy: EncryptionMaskPolicy,
    fs: FsHeader,
}

impl BinRead for BundleHeader {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let endian = binrw::Endian::Big;
        let start = reader.stream_position()?;

        let signature = read_string(reader, endian)?;
        if signature != UNITY_FS_SIGNATURE {
            return Err(binrw::Error::Custom {
                pos: start,
                err: Box::new(BundleError::UnsupportedFormat(signature)),
            });
        }

        let version = u32::read_options(reader, endian, ())?;
        let generation_version = read_string(reader, endian)?;
        let engine_version = read_string(reader, endian)?;
        let fs = FsHeader::read_options(reader, endian, ())?;

        let parsed_engine_version = EngineVersion::parse(&engine_version);
        let align_after_header = if version >= 7 {
            true
        } else if parsed_engine_version.major() == 2019 && parsed_engine_version.minor() == 4 {
            probe_zero_padding(reader)?
        } else {
            false
        };
        let policy = EncryptionMaskPolicy::for_version(&parsed_engine_version);

        trace!(
            version,
            engine = %engine_version,
            %policy,
            align_after_header,
            flags = %fs.flags,
            "parsed UnityFS header"
        );

        Ok(Self {
            signature,
            version,
            generation_version,
            engine_version,
            parsed_engine_version,
            align_after_header,
            policy,
            fs,
        })
    }
}

impl BinWrite for BundleHeader {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        let endian = binrw::Endian::Big;
        if self.signature != UNITY_FS_SIGNATURE {
            return Err(binrw::Error::Custom {
                pos: writer.stream_position().unwrap_or(0),
                err: Box::new(BundleError::UnsupportedFormat(self.signature.clone())),
            });
        }

        NullString::from(self.signature.as_str()).write_options(writer, endian, ())?;
        self.version.write_options(writer, endian, ())?;
        NullString::from(self.generation_version.as_str()).write_options(writer, endian, ())?;
        NullString::from(self.engine_version.as_str()).write_options(writer, endian, ())?;
        self.fs.write_options(writer, endian, ())
    }
}

/// Null-terminated string; offsets depend on its byte length, so invalid
/// UTF-8 is an error rather than replaced.
fn read_string<R: Read + Seek>(reader: &mut R, endian: binrw::Endian) -> BinResult<String> {
    let pos = reader.stream_position()?;
    let raw = NullString::read_options(reader, endian, ())?;
    String::from_utf8(raw.0).map_err(|e| binrw::Error::Custom {
        pos,
        err: Box::new(BundleError::InvalidHeader(format!(
            "string at offset {pos} is not UTF-8: {e}"
        ))),
    })
}

/// Look at the bytes up to the next 16-byte boundary without consuming them.
///
/// All zero means the writer padded the header. A short read counts as
/// unpadded.
fn probe_zero_padding<R: Read + Seek>(reader: &mut R) -> BinResult<bool> {
    let position = reader.stream_position()?;
    let len = 16 - position % 16;

    let mut probe = Vec::with_capacity(len as usize);
    reader.by_ref().take(len).read_to_end(&mut probe)?;
    reader.seek(SeekFrom::Start(position))?;

    Ok(probe.len() as u64 == len && probe.iter().all(|&b| b == 0))
}

impl BundleHeader {
    /// Build a header for a new container.
    ///
    /// Alignment after the header is assumed for version 7 and later; use
    /// [`with_alignment`](Self::with_alignment) to override it.
    pub fn new(
        version: u32,
        generation_version: impl Into<String>,
        engine_version: impl Into<String>,
        fs: FsHeader,
    ) -> Self {
        let engine_version = engine_version.into();
        let parsed_engine_version = EngineVersion::parse(&engine_version);
        let policy = EncryptionMaskPolicy::for_version(&parsed_engine_version);
        Self {
            signature: UNITY_FS_SIGNATURE.to_string(),
            version,
            generation_version: generation_version.into(),
            engine_version,
            parsed_engine_version,
            align_after_header: version >= 7,
            policy,
            fs,
        }
    }

    /// Override the alignment-after-header decision
    pub fn with_alignment(mut self, align_after_header: bool) -> Self {
        self.align_after_header = align_after_header;
        self
    }

    /// Replace the signature.
    ///
    /// Anything other than `UnityFS` makes every offset accessor and the
    /// writer fail with [`BundleError::UnsupportedFormat`].
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Parse a header, unwrapping format errors raised inside the reader
    pub fn parse<R: Read + Seek>(reader: &mut R) -> BundleResult<Self> {
        Self::read_be(reader).map_err(BundleError::from_binrw)
    }

    /// Container signature
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Format version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Generation version string, `"5.x.x"` for every UnityFS bundle
    pub fn generation_version(&self) -> &str {
        &self.generation_version
    }

    /// Engine version string as stored
    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// Engine version as integers
    pub fn parsed_engine_version(&self) -> &EngineVersion {
        &self.parsed_engine_version
    }

    /// Whether the blocks info starts on a 16-byte boundary
    pub fn align_after_header(&self) -> bool {
        self.align_after_header
    }

    /// Flag interpretation selected from the engine version
    pub fn policy(&self) -> EncryptionMaskPolicy {
        self.policy
    }

    /// Sub-header
    pub fn fs_header(&self) -> &FsHeader {
        &self.fs
    }

    /// Archive flags
    pub fn flags(&self) -> ArchiveFlags {
        self.fs.flags
    }

    /// UnityCN encrypted, under the selected policy
    pub fn is_encrypted(&self) -> bool {
        self.fs.flags.is_encrypted(self.policy)
    }

    /// Blocks info is followed by 16-byte padding, under the selected policy
    pub fn block_info_need_padding_at_start(&self) -> bool {
        self.fs.flags.block_info_need_padding_at_start(self.policy)
    }

    fn ensure_supported(&self) -> BundleResult<()> {
        if self.signature == UNITY_FS_SIGNATURE {
            Ok(())
        } else {
            Err(BundleError::UnsupportedFormat(self.signature.clone()))
        }
    }

    /// Offset just past the header, the cipher block and the alignment
    fn header_end(&self) -> i64 {
        let flags = self.fs.flags;
        let mut offset =
            (self.generation_version.len() + self.engine_version.len()) as i64 + HEADER_PREFIX_SIZE;
        if flags.old_web_plugin_compatibility() {
            offset += OLD_WEB_PLUGIN_SIZE;
        } else {
            offset += self.signature.len() as i64 + 1;
        }
        if self.is_encrypted() {
            offset += UNITY_CN_HEADER_SIZE as i64;
        }
        if self.align_after_header {
            offset = align16(offset);
        }
        offset
    }

    /// Absolute offset of the blocks info.
    ///
    /// `None` when the blocks info is at the end of a file of unknown size.
    pub fn directory_offset(&self) -> BundleResult<Option<i64>> {
        self.ensure_supported()?;

        let fs = &self.fs;
        if fs.flags.blocks_info_at_end() {
            if fs.total_file_size == 0 {
                return Ok(None);
            }
            return Ok(Some(fs.total_file_size - i64::from(fs.compressed_size)));
        }
        Ok(Some(self.header_end()))
    }

    /// Absolute offset of the first storage block
    pub fn file_data_offset(&self) -> BundleResult<i64> {
        self.ensure_supported()?;

        let mut offset = self.header_end();
        if !self.fs.flags.blocks_info_at_end() {
            offset += i64::from(self.fs.compressed_size);
        }
        match self.policy {
            EncryptionMaskPolicy::Legacy => {}
            EncryptionMaskPolicy::Modern => {
                if self.block_info_need_padding_at_start() {
                    offset = align16(offset);
                }
            }
        }
        Ok(offset)
    }

    /// Raw compression value of the blocks info (`flags & 0x3F`)
    pub fn compression_type(&self) -> BundleResult<u8> {
        self.ensure_supported()?;
        Ok(self.fs.flags.compression_bits() as u8)
    }

    /// Compression of the blocks info
    pub fn compression(&self) -> BundleResult<CompressionType> {
        self.ensure_supported()?;
        CompressionType::from_bits(self.fs.flags.compression_bits())
    }
}
