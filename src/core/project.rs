//! Consuming project configuration (localsync.toml)
//!
//! Declares which local libraries the project consumes and where their
//! sources live, plus per-project sync options.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::defaults::{DEFAULT_INSTALL_DIR, PROJECT_CONFIG_FILE};
use crate::core::cache::CacheStore;
use crate::error::ConfigError;

/// A local library the project consumes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyDeclaration {
    /// Package name, as it appears under the install directory
    pub name: String,
    /// Source directory, relative to the project root
    pub path: PathBuf,
}

/// Per-project options
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectOptions {
    /// Maximum dependencies processed at once
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Dependency install directory, relative to the project root
    #[serde(default)]
    pub install_dir: Option<String>,

    /// Package manager used to build and pack the libraries
    #[serde(default)]
    pub package_manager: Option<String>,

    /// Extra fingerprint exclusion globs
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Contents of `localsync.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Options
    #[serde(default)]
    pub options: ProjectOptions,

    /// Declared local dependencies, in declaration order
    #[serde(default)]
    pub dependencies: Vec<DependencyDeclaration>,
}

impl ProjectConfig {
    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reject duplicate or empty dependency names
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for dep in &self.dependencies {
            if dep.name.trim().is_empty() {
                return Err(ConfigError::EmptyName {
                    path: dep.path.clone(),
                });
            }
            if !seen.insert(dep.name.as_str()) {
                return Err(ConfigError::DuplicateDependency {
                    name: dep.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A loaded consuming project
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: ProjectConfig,
}

impl Project {
    /// Build a project from an already parsed configuration
    pub fn new(root: PathBuf, config: ProjectConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { root, config })
    }

    /// Load `localsync.toml` from `root`
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(PROJECT_CONFIG_FILE);
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            error: e.to_string(),
        })?;

        let config = ProjectConfig::from_toml(&content).map_err(|e| ConfigError::Parse {
            path,
            error: e.to_string(),
        })?;

        Self::new(root.to_path_buf(), config)
    }

    /// Project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parsed configuration
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Declared dependencies, in declaration order
    pub fn dependencies(&self) -> &[DependencyDeclaration] {
        &self.config.dependencies
    }

    /// Declared names, in declaration order
    pub fn dependency_names(&self) -> Vec<&str> {
        self.config
            .dependencies
            .iter()
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Absolute source directory of a declared dependency
    pub fn source_dir(&self, dependency: &DependencyDeclaration) -> PathBuf {
        self.root.join(&dependency.path)
    }

    /// Consumer's dependency install directory
    pub fn install_root(&self) -> PathBuf {
        self.root.join(
            self.config
                .options
                .install_dir
                .as_deref()
                .unwrap_or(DEFAULT_INSTALL_DIR),
        )
    }

    /// Cache store for this project
    pub fn cache_store(&self) -> CacheStore {
        CacheStore::for_project(&self.root)
    }
}
