//! Global configuration management
//!
//! Reads user-wide defaults from `config.toml` in the config directory.
//! Project settings in `localsync.toml` and command-line flags take
//! precedence over anything set here.

use crate::infra::dirs::LocalsyncDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Global configuration for localsync
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Sync defaults
    #[serde(default)]
    pub sync: SyncConfig,

    /// Fingerprint defaults
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
}

/// Sync defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Default concurrency ceiling
    pub concurrency: Option<usize>,

    /// Default package manager
    pub package_manager: Option<String>,
}

/// Fingerprint defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintConfig {
    /// Extra exclusion globs applied to every project
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// A missing file yields the defaults; an invalid one is an error.
    pub fn load(dirs: &LocalsyncDirs) -> Result<Self, ConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = GlobalConfig::default();
        assert!(config.sync.concurrency.is_none());
        assert!(config.sync.package_manager.is_none());
        assert!(config.fingerprint.exclude.is_empty());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = GlobalConfig::load_from_path(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn test_load_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let dirs = LocalsyncDirs::with_config_dir(temp_dir.path().to_path_buf());
        fs::write(
            dirs.global_config_path(),
            r#"
[sync]
concurrency = 4
package_manager = "yarn"

[fingerprint]
exclude = ["*.md"]
"#,
        )
        .unwrap();

        let config = GlobalConfig::load(&dirs).unwrap();
        assert_eq!(config.sync.concurrency, Some(4));
        assert_eq!(config.sync.package_manager.as_deref(), Some("yarn"));
        assert_eq!(config.fingerprint.exclude, vec!["*.md".to_string()]);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid toml [[[").unwrap();

        assert!(matches!(
            GlobalConfig::load_from_path(&config_path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
