//! Platform-specific directory management
//!
//! Provides the location of the global configuration directory. Follows the
//! XDG Base Directory Specification on Linux and standard locations on
//! macOS and Windows.
//!
//! `LOCALSYNC_CONFIG_DIR` overrides the default.

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the config directory
pub const ENV_CONFIG_DIR: &str = "LOCALSYNC_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "localsync";

/// Platform-specific directory provider for localsync
#[derive(Debug, Clone)]
pub struct LocalsyncDirs {
    config_dir: PathBuf,
}

impl LocalsyncDirs {
    /// Create a new `LocalsyncDirs` instance
    ///
    /// Checks the environment first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
        }
    }

    /// Use an explicit config directory
    #[must_use]
    pub fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/localsync` or `~/.config/localsync`
    /// - macOS: `~/Library/Application Support/localsync`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Get the global config file path
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Resolve config directory from environment or platform default
    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                // Fallback to home directory
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }
}

impl Default for LocalsyncDirs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_new_creates_instance() {
        let dirs = LocalsyncDirs::new();
        assert!(!dirs.config_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_global_config_path_is_under_config_dir() {
        let dirs = LocalsyncDirs::with_config_dir(PathBuf::from("/tmp/localsync-test"));
        assert!(dirs.global_config_path().starts_with(dirs.config_dir()));
        assert!(dirs.global_config_path().ends_with("config.toml"));
    }
}
