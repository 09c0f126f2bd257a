//! Loaded-file registry and dependency resolution for Unity serialized files
//!
//! A serialized file names the files it depends on in its external-reference
//! table. This crate keeps the set of loaded files, resolves those references
//! against the registry, the file system and the entries of the owning
//! bundle, and walks the dependency graph breadth first.
//!
//! Decoding serialized files is left to the caller: anything implementing
//! [`SerializedFileParser`] can supply the external-reference list.
//!
//! # Example
//!
//! ```no_run
//! use ubundle_assets::{AssetsManager, ExternalReference, LoaderConfig, ParserError};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! fn no_externals(_data: &[u8]) -> Result<Vec<ExternalReference>, ParserError> {
//!     Ok(Vec::new())
//! }
//!
//! let manager = AssetsManager::with_config(LoaderConfig::new().with_max_files(256), no_externals);
//! let level = manager.load_assets_file("Game_Data/level0")?;
//! let reachable = manager.load_with_dependencies(&level)?;
//! println!("{} files reachable from level0", reachable.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Configuration
pub mod config;

// Errors
pub mod error;

// External references and the parser seam
pub mod external;

// Loaded files
pub mod instance;

// Registry keyed by lowercase base name
pub mod registry;

// Pure reference resolution
pub mod resolver;

// Loader facade
mod manager;

pub use config::LoaderConfig;
pub use error::{AssetsError, AssetsResult};
pub use external::{ExternalReference, ParserError, SerializedFileParser};
pub use instance::{AssetsFileInstance, BundleFileInstance, FileOrigin};
pub use manager::AssetsManager;
pub use registry::{LoadedFileRegistry, file_key};
pub use resolver::{Resolution, ResolveOrigin, resolve_reference};
