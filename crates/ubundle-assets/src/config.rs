//! Configuration for the asset loader

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AssetsError, AssetsResult};

/// Configuration for [`AssetsManager`](crate::AssetsManager)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// UnityCN key (32 hex characters) for encrypted bundles
    pub unity_cn_key: Option<String>,

    /// Stop loading dependencies once this many files are registered
    pub max_files: Option<usize>,
}

impl LoaderConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the UnityCN key
    #[must_use]
    pub fn with_unity_cn_key(mut self, key: impl Into<String>) -> Self {
        self.unity_cn_key = Some(key.into());
        self
    }

    /// Bound the number of registered files
    #[must_use]
    pub const fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = Some(max_files);
        self
    }

    /// Load a configuration from a JSON file
    ///
    /// ```json
    /// { "unity_cn_key": "00112233445566778899AABBCCDDEEFF", "max_files": 512 }
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> AssetsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| AssetsError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the key is usable
    pub fn validate(&self) -> AssetsResult<()> {
        if let Some(key) = &self.unity_cn_key {
            ubundle_crypto::UnityCnKey::from_hex(key)
                .map_err(|e| AssetsError::Config(format!("unity_cn_key: {e}")))?;
        }
        if self.max_files == Some(0) {
            return Err(AssetsError::Config(
                "max_files must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
