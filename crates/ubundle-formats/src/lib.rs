//! File format parsers and builders for UnityFS asset bundles
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::doc_markdown)] // Unity-specific terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate reads the UnityFS container: the versioned header and its
//! offset calculus, the blocks info and directory, and the storage blocks,
//! decrypting UnityCN-protected blocks with [`ubundle_crypto`].
//!
//! # Design Principles
//!
//! - **Symmetric Operations**: headers and blocks info both parse and build
//! - **Explicit Interpretations**: the two historical meanings of the archive
//!   flags are separate code paths chosen from the engine version
//! - **Round-Trip Guarantee**: `BundleFile::read(BundleBuilder::build())`
//!   yields the files that went in
//!
//! # Example
//!
//! ```
//! use ubundle_formats::bundle::{BundleBuilder, BundleFile, CompressionType};
//!
//! # fn main() -> Result<(), ubundle_formats::bundle::BundleError> {
//! let bytes = BundleBuilder::new(7, "2021.3.15f1")
//!     .with_block_compression(CompressionType::Lz4)
//!     .add_file("CAB-0001", b"serialized file".to_vec())
//!     .build()?;
//!
//! let bundle = BundleFile::from_bytes(&bytes, None)?;
//! assert_eq!(bundle.directory()[0].path, "CAB-0001");
//! assert_eq!(bundle.entry_data(0)?, b"serialized file");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// UnityFS bundle container
///
/// Header, offset calculus, blocks info, block compression and the
/// [`BundleFile`](bundle::BundleFile) reader.
pub mod bundle;
