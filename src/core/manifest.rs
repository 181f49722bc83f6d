//! Package manifest (package.json) reading
//!
//! Only the fields the cache, graph builder and executor need are modeled.
//! Every field is optional; a manifest missing any of them still loads.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::defaults::MANIFEST_FILE;
use crate::error::ManifestError;

/// The subset of `package.json` localsync reads
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Package name
    #[serde(default)]
    pub name: Option<String>,

    /// Declared version
    #[serde(default)]
    pub version: Option<String>,

    /// CommonJS entry point
    #[serde(default)]
    pub main: Option<String>,

    /// ES module entry point
    #[serde(default)]
    pub module: Option<String>,

    /// Type declarations entry point
    #[serde(default, alias = "typings")]
    pub types: Option<String>,

    /// Runtime dependencies
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Development dependencies
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Peer dependencies
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,

    /// npm scripts
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Parse from a JSON string
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Load the manifest from a package directory
    ///
    /// Returns `Ok(None)` when the directory has no manifest at all.
    pub fn load(package_dir: &Path) -> Result<Option<Self>, ManifestError> {
        let path = package_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ManifestError::Read {
            path: path.clone(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
            .map(Some)
            .map_err(|e| ManifestError::Parse {
                path,
                error: e.to_string(),
            })
    }

    /// The `build` script, if one is declared
    pub fn build_script(&self) -> Option<&str> {
        self.scripts.get("build").map(String::as_str)
    }

    /// Names across dependencies, devDependencies and peerDependencies
    pub fn combined_dependency_names(&self) -> BTreeSet<&str> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .chain(self.peer_dependencies.keys())
            .map(String::as_str)
            .collect()
    }
}
