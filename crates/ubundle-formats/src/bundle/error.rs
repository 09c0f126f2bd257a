//! UnityFS bundle error types

use thiserror::Error;
use ubundle_crypto::CryptoError;

/// Bundle-specific error type
#[derive(Debug, Error)]
pub enum BundleError {
    /// Signature other than `UnityFS`
    #[error("{0} signature not supported")]
    UnsupportedFormat(String),

    /// Header field that cannot be represented
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Compression method that is recognised but not implemented
    #[error("unsupported compression type: {0}")]
    UnsupportedCompression(&'static str),

    /// Compression value outside the known set
    #[error("unknown compression type: 0x{0:02X}")]
    UnknownCompression(u32),

    /// Decompression failed
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Compression failed
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    /// Encrypted block found but no key was supplied
    #[error("block {0} is UnityCN encrypted but no key was supplied")]
    MissingKey(usize),

    /// Blocks info or directory is inconsistent
    #[error("invalid blocks info: {0}")]
    InvalidBlocksInfo(String),

    /// Directory entry points outside the decompressed data
    #[error("entry {path:?} ({offset}+{size}) is outside the {available} bytes of bundle data")]
    EntryOutOfRange {
        /// Entry path
        path: String,
        /// Entry offset
        offset: i64,
        /// Entry size
        size: i64,
        /// Decompressed data length
        available: usize,
    },

    /// UnityCN error
    #[error("UnityCN error: {0}")]
    Crypto(#[from] CryptoError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl BundleError {
    /// Recover a bundle error raised inside a binrw reader or writer
    pub(crate) fn from_binrw(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Custom { pos, err } => match err.downcast::<Self>() {
                Ok(err) => *err,
                Err(err) => Self::BinRw(binrw::Error::Custom { pos, err }),
            },
            other => Self::BinRw(other),
        }
    }
}

/// Result type for bundle operations
pub type BundleResult<T> = Result<T, BundleError>;
