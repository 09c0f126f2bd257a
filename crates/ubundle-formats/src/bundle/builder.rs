//! UnityFS bundle builder

use std::io::{Cursor, Write};

use binrw::BinWrite;
use ubundle_crypto::{CryptoError, UnityCnCipher};

use super::blocks::{BlocksInfo, DirectoryEntry, StorageBlock};
use super::compression::compress_block;
use super::error::{BundleError, BundleResult};
use super::flags::{ArchiveFlags, CompressionType};
use super::header::{BundleHeader, FsHeader};
use super::version::{EncryptionMaskPolicy, EngineVersion};

/// Unity splits bundle data into 128 KiB blocks
const DEFAULT_BLOCK_SIZE: usize = 0x2_0000;

/// Generation version written by every UnityFS producer
const GENERATION_VERSION: &str = "5.x.x";

/// Builder for UnityFS bundles
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    version: u32,
    engine_version: String,
    block_compression: CompressionType,
    info_compression: CompressionType,
    block_size: usize,
    blocks_info_at_end: bool,
    block_info_padding: bool,
    align_after_header: Option<bool>,
    cipher: Option<UnityCnCipher>,
    files: Vec<(String, Vec<u8>, u32)>,
}

impl BundleBuilder {
    /// Start a bundle with the given format and engine versions
    pub fn new(version: u32, engine_version: impl Into<String>) -> Self {
        Self {
            version,
            engine_version: engine_version.into(),
            block_compression: CompressionType::Lz4Hc,
            info_compression: CompressionType::Lz4Hc,
            block_size: DEFAULT_BLOCK_SIZE,
            blocks_info_at_end: false,
            block_info_padding: false,
            align_after_header: None,
            cipher: None,
            files: Vec::new(),
        }
    }

    /// Compression of the storage blocks
    #[must_use]
    pub fn with_block_compression(mut self, compression: CompressionType) -> Self {
        self.block_compression = compression;
        self
    }

    /// Compression of the blocks info
    #[must_use]
    pub fn with_info_compression(mut self, compression: CompressionType) -> Self {
        self.info_compression = compression;
        self
    }

    /// Uncompressed size of each storage block (at least one byte)
    #[must_use]
    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size.max(1);
        self
    }

    /// Store the blocks info after the storage blocks
    #[must_use]
    pub fn with_blocks_info_at_end(mut self, at_end: bool) -> Self {
        self.blocks_info_at_end = at_end;
        self
    }

    /// Pad the blocks info to 16 bytes. Only expressible for engine versions
    /// using the modern flag layout; ignored otherwise.
    #[must_use]
    pub fn with_block_info_padding(mut self, padding: bool) -> Self {
        self.block_info_padding = padding;
        self
    }

    /// Override alignment after the header (defaults to `version >= 7`)
    #[must_use]
    pub fn with_alignment(mut self, align: bool) -> Self {
        self.align_after_header = Some(align);
        self
    }

    /// Encrypt every storage block with a keyed cipher
    #[must_use]
    pub fn with_cipher(mut self, cipher: UnityCnCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Add a serialized file
    #[must_use]
    pub fn add_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.files
            .push((path.into(), data.into(), DirectoryEntry::SERIALIZED_FILE));
        self
    }

    /// Add a resource blob (`.resS`, `.resource`)
    #[must_use]
    pub fn add_resource(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.into(), data.into(), 0));
        self
    }

    fn header(&self, fs: FsHeader) -> BundleHeader {
        let header = BundleHeader::new(
            self.version,
            GENERATION_VERSION,
            self.engine_version.clone(),
            fs,
        );
        match self.align_after_header {
            Some(align) => header.with_alignment(align),
            None => header,
        }
    }

    fn archive_flags(&self) -> ArchiveFlags {
        let policy = EncryptionMaskPolicy::for_version(&EngineVersion::parse(&self.engine_version));
        let mut bits = ArchiveFlags::BLOCKS_AND_DIRECTORY_COMBINED;
        if self.blocks_info_at_end {
            bits |= ArchiveFlags::BLOCKS_INFO_AT_END;
        }
        if self.cipher.is_some() {
            bits |= match policy {
                EncryptionMaskPolicy::Legacy => EncryptionMaskPolicy::LEGACY_ENCRYPTION_MASK,
                EncryptionMaskPolicy::Modern => ArchiveFlags::ENCRYPTION,
            };
        }
        if self.block_info_padding && policy.has_block_info_padding_bit() {
            bits |= ArchiveFlags::BLOCK_INFO_NEED_PADDING_AT_START;
        }
        ArchiveFlags::new(bits).with_compression(self.info_compression)
    }

    /// Compress, encrypt and lay out the bundle
    pub fn build(&self) -> BundleResult<Vec<u8>> {
        if let Some(cipher) = &self.cipher {
            if !cipher.is_ready() {
                return Err(CryptoError::CipherNotInitialized.into());
            }
            if !matches!(
                self.block_compression,
                CompressionType::Lz4 | CompressionType::Lz4Hc
            ) {
                return Err(BundleError::InvalidBlocksInfo(format!(
                    "UnityCN encryption needs LZ4 blocks, not {}",
                    self.block_compression
                )));
            }
        }

        let mut payload = Vec::new();
        let mut directory = Vec::with_capacity(self.files.len());
        for (path, data, flags) in &self.files {
            directory.push(DirectoryEntry::new(
                path.clone(),
                payload.len() as i64,
                data.len() as i64,
                *flags,
            ));
            payload.extend_from_slice(data);
        }

        let mut blocks = Vec::new();
        let mut block_data = Vec::new();
        for (ordinal, chunk) in payload.chunks(self.block_size).enumerate() {
            let mut compressed = compress_block(chunk, self.block_compression)?;
            let mut flags = self.block_compression.as_bits() as u16;
            if let Some(cipher) = &self.cipher {
                cipher.encrypt_block(&mut compressed, ordinal)?;
                flags |= StorageBlock::ENCRYPTED;
            }
            blocks.push(StorageBlock {
                uncompressed_size: chunk.len() as u32,
                compressed_size: compressed.len() as u32,
                flags,
            });
            block_data.extend_from_slice(&compressed);
        }

        let info = BlocksInfo {
            hash: [0; 16],
            blocks,
            directory,
        };
        let mut info_bytes = Cursor::new(Vec::new());
        info.write_be(&mut info_bytes)
            .map_err(BundleError::from_binrw)?;
        let info_bytes = info_bytes.into_inner();
        let raw_info = compress_block(&info_bytes, self.info_compression)?;

        let mut fs = FsHeader {
            total_file_size: 0,
            compressed_size: raw_info.len() as u32,
            decompressed_size: info_bytes.len() as u32,
            flags: self.archive_flags(),
        };
        let header = self.header(fs);

        let mut out = Cursor::new(Vec::new());
        header.write_be(&mut out).map_err(BundleError::from_binrw)?;
        if let Some(cipher) = &self.cipher {
            cipher.write_be(&mut out).map_err(BundleError::from_binrw)?;
        }
        if header.align_after_header() {
            pad16(&mut out)?;
        }
        if !self.blocks_info_at_end {
            out.write_all(&raw_info)?;
        }
        if header.block_info_need_padding_at_start() {
            pad16(&mut out)?;
        }
        out.write_all(&block_data)?;
        if self.blocks_info_at_end {
            out.write_all(&raw_info)?;
        }

        // same length, so rewriting in place only patches the size field
        fs.total_file_size = out.get_ref().len() as i64;
        out.set_position(0);
        self.header(fs)
            .write_be(&mut out)
            .map_err(BundleError::from_binrw)?;

        Ok(out.into_inner())
    }
}

fn pad16(out: &mut Cursor<Vec<u8>>) -> BundleResult<()> {
    let padding = (16 - out.get_ref().len() % 16) % 16;
    out.write_all(&[0u8; 16][..padding])?;
    Ok(())
}
