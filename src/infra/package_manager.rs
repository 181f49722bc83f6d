//! JavaScript package manager selection
//!
//! An explicit setting wins; otherwise the manager is inferred from the
//! lockfile present in the library directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConfigError, ExecutorError};

/// Supported package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageManager {
    /// npm
    #[default]
    Npm,
    /// Yarn
    Yarn,
    /// pnpm
    Pnpm,
    /// Bun
    Bun,
}

/// Lockfiles checked in order during detection
const LOCKFILES: &[(&str, PackageManager)] = &[
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
    ("bun.lockb", PackageManager::Bun),
    ("bun.lock", PackageManager::Bun),
];

impl PackageManager {
    /// Executable name
    pub fn command(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
            Self::Bun => "bun",
        }
    }

    /// Infer from the lockfile in `dir`, defaulting to npm
    pub fn detect(dir: &Path) -> Self {
        LOCKFILES
            .iter()
            .find(|(file, _)| dir.join(file).exists())
            .map_or(Self::Npm, |(_, pm)| *pm)
    }

    /// Explicit choice if given, otherwise [`Self::detect`]
    pub fn resolve(explicit: Option<Self>, dir: &Path) -> Self {
        explicit.unwrap_or_else(|| Self::detect(dir))
    }

    /// Locate the executable on `PATH`
    pub fn ensure_available(self) -> Result<PathBuf, ExecutorError> {
        ensure_tool(self.command())
    }
}

/// Locate `tool` on `PATH`
pub fn ensure_tool(tool: &str) -> Result<PathBuf, ExecutorError> {
    which::which(tool).map_err(|_| ExecutorError::ToolNotFound {
        tool: tool.to_string(),
    })
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for PackageManager {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "npm" => Ok(Self::Npm),
            "yarn" => Ok(Self::Yarn),
            "pnpm" => Ok(Self::Pnpm),
            "bun" => Ok(Self::Bun),
            _ => Err(ConfigError::UnknownPackageManager {
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_defaults_to_npm() {
        let temp = TempDir::new().unwrap();
        assert_eq!(PackageManager::detect(temp.path()), PackageManager::Npm);
    }

    #[test]
    fn test_detect_by_lockfile() {
        for (file, expected) in [
            ("pnpm-lock.yaml", PackageManager::Pnpm),
            ("yarn.lock", PackageManager::Yarn),
            ("bun.lockb", PackageManager::Bun),
            ("package-lock.json", PackageManager::Npm),
        ] {
            let temp = TempDir::new().unwrap();
            std::fs::write(temp.path().join(file), "").unwrap();
            assert_eq!(PackageManager::detect(temp.path()), expected, "{file}");
        }
    }

    #[test]
    fn test_explicit_wins() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("yarn.lock"), "").unwrap();
        assert_eq!(
            PackageManager::resolve(Some(PackageManager::Pnpm), temp.path()),
            PackageManager::Pnpm
        );
        assert_eq!(
            PackageManager::resolve(None, temp.path()),
            PackageManager::Yarn
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("PNPM".parse::<PackageManager>().unwrap(), PackageManager::Pnpm);
        assert_eq!(" bun ".parse::<PackageManager>().unwrap(), PackageManager::Bun);
        assert!(matches!(
            "cargo".parse::<PackageManager>(),
            Err(ConfigError::UnknownPackageManager { .. })
        ));
    }

    #[test]
    fn test_missing_tool() {
        assert!(matches!(
            ensure_tool("localsync-definitely-not-a-real-tool"),
            Err(ExecutorError::ToolNotFound { .. })
        ));
    }
}
