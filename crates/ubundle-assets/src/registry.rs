//! Registry of loaded files
//!
//! Files are keyed by their lowercased base name, so a reference to
//! `Assets/Shared/SharedAssets0.assets` is satisfied by a loaded
//! `sharedassets0.assets` from any directory. The key is the only
//! deduplication mechanism.

use std::collections::HashMap;
use std::sync::Arc;

use ubundle_formats::bundle::file_name_of;

/// Registry key for a path or reference
pub fn file_key(path: &str) -> String {
    file_name_of(path).to_lowercase()
}

/// Loaded files by key
#[derive(Debug)]
pub struct LoadedFileRegistry<T> {
    files: HashMap<String, Arc<T>>,
    order: Vec<String>,
}

impl<T> Default for LoadedFileRegistry<T> {
    fn default() -> Self {
        Self {
            files: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T> LoadedFileRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a file with the same key as `path` is loaded
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&file_key(path))
    }

    /// File with the same key as `path`
    pub fn get(&self, path: &str) -> Option<Arc<T>> {
        self.files.get(&file_key(path)).cloned()
    }

    /// Register `file` under the key of `path`.
    ///
    /// If the key is taken the existing file is kept and returned.
    pub fn insert(&mut self, path: &str, file: T) -> Arc<T> {
        let key = file_key(path);
        if let Some(existing) = self.files.get(&key) {
            return Arc::clone(existing);
        }
        let file = Arc::new(file);
        self.order.push(key.clone());
        self.files.insert(key, Arc::clone(&file));
        file
    }

    /// Number of loaded files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing is loaded
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Loaded files in load order
    pub fn files(&self) -> Vec<Arc<T>> {
        self.order
            .iter()
            .filter_map(|key| self.files.get(key).cloned())
            .collect()
    }

    /// Drop every file
    pub fn clear(&mut self) {
        self.files.clear();
        self.order.clear();
    }
}
