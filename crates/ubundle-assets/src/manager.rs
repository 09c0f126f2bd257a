//! Asset loader: owns the registry and drives dependency resolution

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use ubundle_formats::bundle::{BundleFile, file_name_of};

use crate::config::LoaderConfig;
use crate::error::{AssetsError, AssetsResult};
use crate::external::{ExternalReference, SerializedFileParser};
use crate::instance::{AssetsFileInstance, BundleFileInstance, FileOrigin};
use crate::registry::{LoadedFileRegistry, file_key};
use crate::resolver::{Resolution, ResolveOrigin, resolve_reference};

type FileRegistry = LoadedFileRegistry<AssetsFileInstance>;

/// Loads serialized files and bundles, and resolves their dependencies.
///
/// `AssetsManager` is `Send + Sync`; dependencies of independent files can be
/// resolved from several threads. Each reference is checked, resolved and
/// loaded under one lock of the registry, so concurrent resolution never
/// loads a file twice.
pub struct AssetsManager {
    config: LoaderConfig,
    parser: Box<dyn SerializedFileParser>,
    files: Mutex<FileRegistry>,
    bundles: Mutex<LoadedFileRegistry<BundleFileInstance>>,
}

impl fmt::Debug for AssetsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetsManager")
            .field("config", &self.config)
            .field("files", &self.files.lock().len())
            .field("bundles", &self.bundles.lock().len())
            .finish_non_exhaustive()
    }
}

impl AssetsManager {
    /// Create a manager with default configuration
    pub fn new(parser: impl SerializedFileParser + 'static) -> Self {
        Self::with_config(LoaderConfig::default(), parser)
    }

    /// Create a manager with the given configuration
    pub fn with_config(config: LoaderConfig, parser: impl SerializedFileParser + 'static) -> Self {
        Self {
            config,
            parser: Box::new(parser),
            files: Mutex::new(FileRegistry::new()),
            bundles: Mutex::new(LoadedFileRegistry::new()),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loaded serialized files, in load order
    pub fn files(&self) -> Vec<Arc<AssetsFileInstance>> {
        self.files.lock().files()
    }

    /// Loaded file whose base name matches `name`, ignoring case
    pub fn get_file(&self, name: &str) -> Option<Arc<AssetsFileInstance>> {
        self.files.lock().get(name)
    }

    /// Loaded bundles, in load order
    pub fn bundles(&self) -> Vec<Arc<BundleFileInstance>> {
        self.bundles.lock().files()
    }

    /// Drop every loaded file and bundle
    pub fn unload_all(&self) {
        self.files.lock().clear();
        self.bundles.lock().clear();
    }

    /// Load a serialized file from disk.
    ///
    /// Returns the already loaded file when one with the same key exists.
    pub fn load_assets_file(&self, path: impl AsRef<Path>) -> AssetsResult<Arc<AssetsFileInstance>> {
        let mut files = self.files.lock();
        self.load_standalone_locked(&mut files, path.as_ref())
    }

    /// Open a bundle, decrypting it with the configured UnityCN key
    pub fn load_bundle_file(&self, path: impl AsRef<Path>) -> AssetsResult<Arc<BundleFileInstance>> {
        let path = path.as_ref();
        let name = path.to_string_lossy();
        let mut bundles = self.bundles.lock();
        if let Some(existing) = bundles.get(&name) {
            return Ok(existing);
        }

        let file = BundleFile::open(path, self.config.unity_cn_key.as_deref())?;
        info!(
            path = %path.display(),
            entries = file.directory().len(),
            "loaded bundle"
        );
        Ok(bundles.insert(&name, BundleFileInstance::new(path, file)))
    }

    /// Load the serialized file stored at directory entry `index` of `bundle`
    pub fn load_assets_file_from_bundle(
        &self,
        bundle: &Arc<BundleFileInstance>,
        index: usize,
    ) -> AssetsResult<Arc<AssetsFileInstance>> {
        let mut files = self.files.lock();
        self.load_entry_locked(&mut files, bundle, index)
    }

    /// Resolve and load the direct dependencies of `file`.
    ///
    /// Returns every dependency that is loaded after the call, whether it was
    /// loaded now or earlier, in reference order without duplicates.
    /// Unresolved references are logged and skipped. Dependencies of the
    /// returned files are not followed; see
    /// [`load_with_dependencies`](Self::load_with_dependencies).
    pub fn load_dependencies(
        &self,
        file: &AssetsFileInstance,
    ) -> AssetsResult<Vec<Arc<AssetsFileInstance>>> {
        let mut dependencies: Vec<Arc<AssetsFileInstance>> = Vec::new();

        for reference in file.externals() {
            if reference.is_empty() {
                continue;
            }
            let Some(loaded) = self.load_reference(file, reference)? else {
                continue;
            };
            if !dependencies.iter().any(|d| Arc::ptr_eq(d, &loaded)) {
                dependencies.push(loaded);
            }
        }
        Ok(dependencies)
    }

    /// Load `root` and everything reachable from it, breadth first.
    ///
    /// Each file is loaded once, cycles terminate, and the walk stops
    /// loading new files once `max_files` files are registered. Returns the
    /// reachable files in visit order, `root` first.
    pub fn load_with_dependencies(
        &self,
        root: &Arc<AssetsFileInstance>,
    ) -> AssetsResult<Vec<Arc<AssetsFileInstance>>> {
        let mut visited = HashSet::from([file_key(root.name())]);
        let mut order = vec![Arc::clone(root)];
        let mut pending = VecDeque::from([Arc::clone(root)]);

        while let Some(file) = pending.pop_front() {
            for dependency in self.load_dependencies(&file)? {
                if visited.insert(file_key(dependency.name())) {
                    order.push(Arc::clone(&dependency));
                    pending.push_back(dependency);
                }
            }
        }

        debug!(
            root = root.name(),
            reachable = order.len(),
            "dependency walk finished"
        );
        Ok(order)
    }

    /// Check, resolve and load one reference under a single registry lock
    fn load_reference(
        &self,
        file: &AssetsFileInstance,
        reference: &ExternalReference,
    ) -> AssetsResult<Option<Arc<AssetsFileInstance>>> {
        let mut files = self.files.lock();
        if let Some(loaded) = files.get(&reference.path_name) {
            return Ok(Some(loaded));
        }
        if let Some(max_files) = self.config.max_files
            && files.len() >= max_files
        {
            warn!(
                max_files,
                reference = %reference.path_name,
                "file limit reached, not loading dependency"
            );
            return Ok(None);
        }

        let resolution = match file.origin() {
            FileOrigin::Standalone => {
                let directory = file.path().parent().unwrap_or_else(|| Path::new(""));
                resolve_reference(
                    &reference.path_name,
                    &ResolveOrigin::Standalone { directory },
                    Path::is_file,
                )
            }
            FileOrigin::Bundle { bundle, .. } => resolve_reference(
                &reference.path_name,
                &ResolveOrigin::Bundle {
                    bundle_path: bundle.path(),
                    directory: bundle.file().directory(),
                },
                Path::is_file,
            ),
        };

        let loaded = match (resolution, file.bundle()) {
            (Some(Resolution::File(path)), _) => self.load_standalone_locked(&mut files, &path)?,
            (Some(Resolution::BundleEntry(index)), Some(bundle)) => {
                self.load_entry_locked(&mut files, bundle, index)?
            }
            _ => {
                debug!(
                    reference = %reference.path_name,
                    from = %file.path().display(),
                    "dependency not found"
                );
                return Ok(None);
            }
        };
        Ok(Some(loaded))
    }

    fn load_standalone_locked(
        &self,
        files: &mut FileRegistry,
        path: &Path,
    ) -> AssetsResult<Arc<AssetsFileInstance>> {
        let path_text = path.to_string_lossy();
        if let Some(existing) = files.get(&path_text) {
            return Ok(existing);
        }

        let data = std::fs::read(path)?;
        let externals = self.read_externals(path, &data)?;
        debug!(
            path = %path.display(),
            externals = externals.len(),
            "loaded assets file"
        );

        let instance = AssetsFileInstance::new(
            path,
            file_name_of(&path_text),
            data,
            externals,
            FileOrigin::Standalone,
        );
        Ok(files.insert(&path_text, instance))
    }

    fn load_entry_locked(
        &self,
        files: &mut FileRegistry,
        bundle: &Arc<BundleFileInstance>,
        index: usize,
    ) -> AssetsResult<Arc<AssetsFileInstance>> {
        let entry = bundle
            .file()
            .directory()
            .get(index)
            .ok_or_else(|| AssetsError::EntryNotFound {
                bundle: bundle.path().display().to_string(),
                index,
            })?;
        if let Some(existing) = files.get(&entry.path) {
            return Ok(existing);
        }

        let data = bundle.file().entry_data(index)?.to_vec();
        let path = bundle.path().join(&entry.path);
        let externals = self.read_externals(&path, &data)?;
        debug!(
            bundle = %bundle.path().display(),
            entry = %entry.path,
            externals = externals.len(),
            "loaded assets file from bundle"
        );

        let instance = AssetsFileInstance::new(
            path,
            entry.file_name(),
            data,
            externals,
            FileOrigin::Bundle {
                bundle: Arc::clone(bundle),
                entry_index: index,
            },
        );
        Ok(files.insert(&entry.path, instance))
    }

    fn read_externals(&self, path: &Path, data: &[u8]) -> AssetsResult<Vec<ExternalReference>> {
        self.parser
            .read_externals(data)
            .map_err(|e| AssetsError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }
}
