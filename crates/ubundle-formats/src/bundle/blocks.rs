//! Blocks info: storage block table and directory
//!
//! ```text
//! hash             [u8; 16]
//! block_count      i32
//! blocks           block_count x { uncompressed u32, compressed u32, flags u16 }
//! entry_count      i32
//! entries          entry_count x { offset i64, size i64, flags u32, path (null-terminated) }
//! ```

use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite, NullString};

use super::error::{BundleError, BundleResult};
use super::flags::CompressionType;

/// Base name of a bundle or reference path; both `/` and `\` separate
/// components
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// One compressed storage block
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct StorageBlock {
    /// Size after decompression
    pub uncompressed_size: u32,
    /// Size as stored
    pub compressed_size: u32,
    /// Compression in the low 6 bits, plus [`StorageBlock::STREAMED`] and
    /// [`StorageBlock::ENCRYPTED`]
    pub flags: u16,
}

impl StorageBlock {
    /// Block is part of a streamed region
    pub const STREAMED: u16 = 0x40;
    /// Block is UnityCN encrypted
    pub const ENCRYPTED: u16 = 0x100;

    /// Block compression
    pub fn compression(&self) -> BundleResult<CompressionType> {
        CompressionType::from_bits(u32::from(self.flags))
    }

    /// Whether the block must be decrypted before decompression
    pub fn is_encrypted(&self) -> bool {
        self.flags & Self::ENCRYPTED != 0
    }
}

/// A file stored in the bundle's decompressed data
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct DirectoryEntry {
    /// Offset into the decompressed data
    pub offset: i64,
    /// Size in bytes
    pub size: i64,
    /// Node flags
    pub flags: u32,
    /// Path inside the bundle, usually `CAB-<hash>` or `CAB-<hash>.resS`
    #[br(map = |s: NullString| s.to_string())]
    #[bw(map = |s: &String| NullString::from(s.as_str()))]
    pub path: String,
}

impl DirectoryEntry {
    /// Entry is a serialized file (as opposed to a resource blob)
    pub const SERIALIZED_FILE: u32 = 0x4;

    /// Build an entry
    pub fn new(path: impl Into<String>, offset: i64, size: i64, flags: u32) -> Self {
        Self {
            offset,
            size,
            flags,
            path: path.into(),
        }
    }

    /// Base name of the entry path
    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }

    /// Whether the entry holds a serialized file
    pub fn is_serialized_file(&self) -> bool {
        self.flags & Self::SERIALIZED_FILE != 0
    }

    /// Byte range inside data of `available` bytes
    pub fn range(&self, available: usize) -> BundleResult<std::ops::Range<usize>> {
        let out_of_range = || BundleError::EntryOutOfRange {
            path: self.path.clone(),
            offset: self.offset,
            size: self.size,
            available,
        };
        let start = usize::try_from(self.offset).map_err(|_| out_of_range())?;
        let size = usize::try_from(self.size).map_err(|_| out_of_range())?;
        let end = start.checked_add(size).ok_or_else(out_of_range)?;
        if end > available {
            return Err(out_of_range());
        }
        Ok(start..end)
    }
}

/// Decompressed blocks info
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlocksInfo {
    /// Uncompressed data hash, usually zero
    pub hash: [u8; 16],
    /// Storage blocks in data order
    pub blocks: Vec<StorageBlock>,
    /// Files in the decompressed data
    pub directory: Vec<DirectoryEntry>,
}

fn read_count<R: Read + Seek>(reader: &mut R, what: &str) -> BinResult<usize> {
    let pos = reader.stream_position()?;
    let count = i32::read_options(reader, binrw::Endian::Big, ())?;
    usize::try_from(count).map_err(|_| binrw::Error::Custom {
        pos,
        err: Box::new(BundleError::InvalidBlocksInfo(format!(
            "negative {what} count: {count}"
        ))),
    })
}

fn write_count<W: Write + Seek>(writer: &mut W, count: usize) -> BinResult<()> {
    let pos = writer.stream_position()?;
    let count = i32::try_from(count).map_err(|_| binrw::Error::Custom {
        pos,
        err: Box::new(BundleError::InvalidBlocksInfo(format!(
            "too many items: {count}"
        ))),
    })?;
    count.write_options(writer, binrw::Endian::Big, ())
}

impl BinRead for BlocksInfo {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let endian = binrw::Endian::Big;
        let hash = <[u8; 16]>::read_options(reader, endian, ())?;

        let block_count = read_count(reader, "block")?;
        let mut blocks = Vec::new();
        for _ in 0..block_count {
            blocks.push(StorageBlock::read_options(reader, endian, ())?);
        }

        let entry_count = read_count(reader, "directory entry")?;
        let mut directory = Vec::new();
        for _ in 0..entry_count {
            directory.push(DirectoryEntry::read_options(reader, endian, ())?);
        }

        Ok(Self {
            hash,
            blocks,
            directory,
        })
    }
}

impl BinWrite for BlocksInfo {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        let endian = binrw::Endian::Big;
        self.hash.write_options(writer, endian, ())?;

        write_count(writer, self.blocks.len())?;
        for block in &self.blocks {
            block.write_options(writer, endian, ())?;
        }

        write_count(writer, self.directory.len())?;
        for entry in &self.directory {
            entry.write_options(writer, endian, ())?;
        }
        Ok(())
    }
}

impl BlocksInfo {
    /// Parse decompressed blocks info bytes
    pub fn parse(data: &[u8]) -> BundleResult<Self> {
        Self::read_be(&mut binrw::io::Cursor::new(data)).map_err(BundleError::from_binrw)
    }

    /// Sum of the blocks' decompressed sizes
    pub fn total_uncompressed_size(&self) -> u64 {
        self.blocks
            .iter()
            .map(|b| u64::from(b.uncompressed_size))
            .sum()
    }

    /// Sum of the blocks' stored sizes
    pub fn total_compressed_size(&self) -> u64 {
        self.blocks.iter().map(|b| u64::from(b.compressed_size)).sum()
    }

    /// Index of the first entry whose base name equals `file_name`
    /// (case-sensitive)
    pub fn find_entry(&self, file_name: &str) -> Option<usize> {
        self.directory
            .iter()
            .position(|entry| entry.file_name() == file_name)
    }
}
