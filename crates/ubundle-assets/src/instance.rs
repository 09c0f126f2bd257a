//! Loaded files

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ubundle_formats::bundle::BundleFile;

use crate::external::ExternalReference;

/// A bundle opened by the manager
#[derive(Debug)]
pub struct BundleFileInstance {
    path: PathBuf,
    file: BundleFile,
}

impl BundleFileInstance {
    /// Wrap a decoded bundle
    pub fn new(path: impl Into<PathBuf>, file: BundleFile) -> Self {
        Self {
            path: path.into(),
            file,
        }
    }

    /// Path the bundle was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decoded bundle
    pub fn file(&self) -> &BundleFile {
        &self.file
    }
}

/// Where a serialized file came from
#[derive(Debug, Clone)]
pub enum FileOrigin {
    /// A file on disk
    Standalone,
    /// An entry of a loaded bundle
    Bundle {
        /// Owning bundle
        bundle: Arc<BundleFileInstance>,
        /// Index into the bundle's directory
        entry_index: usize,
    },
}

/// A serialized file held by the manager
#[derive(Debug)]
pub struct AssetsFileInstance {
    path: PathBuf,
    name: String,
    data: Vec<u8>,
    externals: Vec<ExternalReference>,
    origin: FileOrigin,
}

impl AssetsFileInstance {
    /// Build an instance. `name` is the base file name used as the registry
    /// key (before lowercasing).
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        data: Vec<u8>,
        externals: Vec<ExternalReference>,
        origin: FileOrigin,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            data,
            externals,
            origin,
        }
    }

    /// Path on disk, or `<bundle path>/<entry path>` for bundle entries
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw serialized file
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// External references, in file order
    pub fn externals(&self) -> &[ExternalReference] {
        &self.externals
    }

    /// Where the file came from
    pub fn origin(&self) -> &FileOrigin {
        &self.origin
    }

    /// Owning bundle, for bundle entries
    pub fn bundle(&self) -> Option<&Arc<BundleFileInstance>> {
        match &self.origin {
            FileOrigin::Bundle { bundle, .. } => Some(bundle),
            FileOrigin::Standalone => None,
        }
    }
}
