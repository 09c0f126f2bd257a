//! UnityFS bundle container
//!
//! A bundle is a big-endian header, an optional UnityCN cipher block, the
//! (usually compressed) blocks info and a sequence of storage blocks. The
//! blocks decompress to one contiguous buffer that the directory slices into
//! named files.
//!
//! # Features
//!
//! - Header parsing with both historical flag interpretations
//! - Offset calculus for the blocks info and the first storage block
//! - Blocks info at the start or at the end of the file, with or without
//!   padding
//! - None, LZMA, LZ4 and LZ4HC blocks; LZHAM is rejected
//! - UnityCN decryption of flagged blocks
//! - A builder for round-trip tests and tooling

mod blocks;
mod builder;
mod compression;
mod error;
mod flags;
mod header;
mod version;

pub use blocks::{BlocksInfo, DirectoryEntry, StorageBlock, file_name_of};
pub use builder::BundleBuilder;
pub use compression::{compress_block, decompress_block, max_decompressed_size};
pub use error::{BundleError, BundleResult};
pub use flags::{ArchiveFlags, CompressionType};
pub use header::{BundleHeader, FsHeader, UNITY_FS_SIGNATURE};
pub use version::{EncryptionMaskPolicy, EngineVersion};

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use binrw::BinRead;
use tracing::{debug, warn};
use ubundle_crypto::UnityCnCipher;

/// Read exactly `len` bytes, growing the buffer only as data arrives
fn read_sized<R: Read>(reader: &mut R, len: u32, buffer: &mut Vec<u8>) -> BundleResult<()> {
    buffer.clear();
    reader.by_ref().take(u64::from(len)).read_to_end(buffer)?;
    if buffer.len() != len as usize {
        return Err(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("expected {len} bytes, stream ended after {}", buffer.len()),
        )
        .into());
    }
    Ok(())
}

/// Advance to the next 16-byte boundary
fn align_reader<R: Read + Seek>(reader: &mut R) -> BundleResult<()> {
    let position = reader.stream_position()?;
    let padding = (16 - position % 16) % 16;
    if padding > 0 {
        reader.seek(SeekFrom::Current(padding as i64))?;
    }
    Ok(())
}

/// Fully decoded bundle
#[derive(Debug, Clone)]
pub struct BundleFile {
    header: BundleHeader,
    cipher: Option<UnityCnCipher>,
    blocks_info: BlocksInfo,
    data: Vec<u8>,
}

impl BundleFile {
    /// Read a bundle starting at the reader's current position.
    ///
    /// `key` is the UnityCN key as hex. It is only consulted when the header
    /// says the container is encrypted; a wrong key fails immediately, a
    /// missing one fails at the first encrypted block.
    pub fn read<R: Read + Seek>(reader: &mut R, key: Option<&str>) -> BundleResult<Self> {
        let start = reader.stream_position()?;
        let header = BundleHeader::parse(reader)?;
        let flags = header.flags();

        let cipher = if header.is_encrypted() {
            let mut cipher = UnityCnCipher::read_be(reader).map_err(BundleError::from_binrw)?;
            match key {
                Some(key) => cipher.set_key(key)?,
                None => warn!("bundle is UnityCN encrypted but no key was supplied"),
            }
            Some(cipher)
        } else {
            None
        };

        if header.align_after_header() {
            align_reader(reader)?;
        }

        let compressed_size = header.fs_header().compressed_size;
        let mut raw_info = Vec::new();
        if flags.blocks_info_at_end() {
            let resume = reader.stream_position()?;
            let offset = match header.directory_offset()? {
                Some(offset) => u64::try_from(offset).ok().map(|offset| start + offset),
                None => reader
                    .seek(SeekFrom::End(0))?
                    .checked_sub(u64::from(compressed_size)),
            }
            .ok_or_else(|| {
                BundleError::InvalidBlocksInfo("blocks info starts before the bundle".to_string())
            })?;
            reader.seek(SeekFrom::Start(offset))?;
            read_sized(reader, compressed_size, &mut raw_info)?;
            reader.seek(SeekFrom::Start(resume))?;
        } else {
            read_sized(reader, compressed_size, &mut raw_info)?;
        }

        let info = decompress_block(
            &raw_info,
            header.compression()?,
            header.fs_header().decompressed_size as usize,
        )?;
        let blocks_info = BlocksInfo::parse(&info)?;

        if header.block_info_need_padding_at_start() {
            align_reader(reader)?;
        }

        let data_start = reader.stream_position()? - start;
        let expected = header.file_data_offset()?;
        if i64::try_from(data_start).ok() != Some(expected) {
            warn!(
                actual = data_start,
                expected, "storage blocks do not start at the computed file data offset"
            );
        }

        debug!(
            engine = header.engine_version(),
            blocks = blocks_info.blocks.len(),
            entries = blocks_info.directory.len(),
            encrypted = header.is_encrypted(),
            "reading bundle data"
        );

        let data = read_blocks(reader, &blocks_info.blocks, cipher.as_ref())?;

        Ok(Self {
            header,
            cipher,
            blocks_info,
            data,
        })
    }

    /// Read a bundle held in memory
    pub fn from_bytes(bytes: &[u8], key: Option<&str>) -> BundleResult<Self> {
        Self::read(&mut std::io::Cursor::new(bytes), key)
    }

    /// Open and read a bundle file
    pub fn open(path: impl AsRef<Path>, key: Option<&str>) -> BundleResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening bundle");
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader, key)
    }

    /// Parsed header
    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    /// Cipher, for encrypted bundles
    pub fn cipher(&self) -> Option<&UnityCnCipher> {
        self.cipher.as_ref()
    }

    /// Storage blocks and directory
    pub fn blocks_info(&self) -> &BlocksInfo {
        &self.blocks_info
    }

    /// Directory entries
    pub fn directory(&self) -> &[DirectoryEntry] {
        &self.blocks_info.directory
    }

    /// Decompressed data of all blocks
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Contents of the directory entry at `index`
    pub fn entry_data(&self, index: usize) -> BundleResult<&[u8]> {
        let entry = self.blocks_info.directory.get(index).ok_or_else(|| {
            BundleError::InvalidBlocksInfo(format!(
                "no directory entry {index}, bundle has {}",
                self.blocks_info.directory.len()
            ))
        })?;
        let range = entry.range(self.data.len())?;
        Ok(&self.data[range])
    }

    /// Index of the entry whose base name equals `file_name`
    pub fn find_entry(&self, file_name: &str) -> Option<usize> {
        self.blocks_info.find_entry(file_name)
    }
}

/// Read, decrypt and decompress every storage block in order.
///
/// Each encrypted block is decrypted with its ordinal in the block list as
/// the seed, not with a running byte count.
fn read_blocks<R: Read>(
    reader: &mut R,
    blocks: &[StorageBlock],
    cipher: Option<&UnityCnCipher>,
) -> BundleResult<Vec<u8>> {
    let mut data = Vec::new();
    let mut compressed = Vec::new();

    for (ordinal, block) in blocks.iter().enumerate() {
        let compression = block.compression()?;
        if block.is_encrypted()
            && !matches!(compression, CompressionType::Lz4 | CompressionType::Lz4Hc)
        {
            return Err(BundleError::InvalidBlocksInfo(format!(
                "block {ordinal} is UnityCN encrypted but {compression} compressed"
            )));
        }

        read_sized(reader, block.compressed_size, &mut compressed)?;

        if block.is_encrypted() {
            let cipher = cipher
                .filter(|cipher| cipher.is_ready())
                .ok_or(BundleError::MissingKey(ordinal))?;
            cipher.decrypt_block(&mut compressed, ordinal)?;
        }

        let decompressed =
            decompress_block(&compressed, compression, block.uncompressed_size as usize)?;
        data.try_reserve(decompressed.len()).map_err(|e| {
            BundleError::InvalidBlocksInfo(format!("cannot hold block {ordinal}: {e}"))
        })?;
        data.extend_from_slice(&decompressed);
    }
    Ok(data)
}
