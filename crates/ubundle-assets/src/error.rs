//! Error types for loading serialized files

use thiserror::Error;
use ubundle_formats::bundle::BundleError;

/// Errors that can occur while loading files and their dependencies.
///
/// An unresolved reference is not an error; it is logged and skipped.
#[derive(Debug, Error)]
pub enum AssetsError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bundle could not be read.
    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// Serialized file parser rejected the data.
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// File being parsed
        path: String,
        /// Parser message
        message: String,
    },

    /// Directory entry index outside the bundle's directory.
    #[error("Bundle {bundle} has no entry {index}")]
    EntryNotFound {
        /// Bundle file name
        bundle: String,
        /// Requested entry
        index: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for asset loading operations.
pub type AssetsResult<T> = std::result::Result<T, AssetsError>;
