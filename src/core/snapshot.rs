//! Metadata snapshots
//!
//! A cheap stand-in for the full fingerprint: the newest modification time
//! among a handful of important paths, the declared version, and a hash of
//! the manifest fields that affect what gets built and installed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::config::defaults::IMPORTANT_PATHS;
use crate::core::manifest::PackageManifest;

/// Partial fingerprint of a library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    /// Newest mtime over the important paths, in milliseconds since the epoch
    pub last_modified: u64,
    /// Declared version
    pub package_version: Option<String>,
    /// Hash over dependency sets, build script and entry points
    pub dependency_hash: String,
}

/// Manifest fields that feed the dependency hash, in canonical form
///
/// Maps are `BTreeMap`s and absent fields are skipped, so serialization is
/// deterministic.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashInput<'a> {
    dependencies: &'a BTreeMap<String, String>,
    dev_dependencies: &'a BTreeMap<String, String>,
    peer_dependencies: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    build_script: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    main: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    types: Option<&'a str>,
}

impl MetadataSnapshot {
    /// Snapshot the library at `source_dir`
    ///
    /// A missing or unparsable manifest is treated as an empty one.
    pub fn capture(source_dir: &Path) -> Self {
        let manifest = match PackageManifest::load(source_dir) {
            Ok(manifest) => manifest.unwrap_or_default(),
            Err(e) => {
                tracing::debug!("Snapshotting without manifest: {e}");
                PackageManifest::default()
            }
        };

        Self::from_manifest(source_dir, &manifest)
    }

    /// Snapshot using an already loaded manifest
    pub fn from_manifest(source_dir: &Path, manifest: &PackageManifest) -> Self {
        Self {
            last_modified: last_modified(source_dir),
            package_version: manifest.version.clone(),
            dependency_hash: dependency_hash(manifest),
        }
    }
}

/// Newest mtime among the important paths that exist, 0 if none do
pub fn last_modified(source_dir: &Path) -> u64 {
    IMPORTANT_PATHS
        .iter()
        .filter_map(|name| std::fs::metadata(source_dir.join(name)).ok())
        .filter_map(|meta| meta.modified().ok())
        .filter_map(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .max()
        .unwrap_or(0)
}

/// SHA-256 over the canonical JSON of the build-relevant manifest fields
pub fn dependency_hash(manifest: &PackageManifest) -> String {
    let input = HashInput {
        dependencies: &manifest.dependencies,
        dev_dependencies: &manifest.dev_dependencies,
        peer_dependencies: &manifest.peer_dependencies,
        build_script: manifest.build_script(),
        main: manifest.main.as_deref(),
        module: manifest.module.as_deref(),
        types: manifest.types.as_deref(),
    };

    // Serializing borrowed maps and strings cannot fail.
    let canonical = serde_json::to_string(&input).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::{bare_package_name, dependency_map, semver_version};
    use proptest::prelude::*;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn manifest(json: &str) -> PackageManifest {
        PackageManifest::from_json(json).unwrap()
    }

    #[test]
    fn test_dependency_hash_is_stable() {
        let a = manifest(r#"{"dependencies": {"a": "1", "b": "2"}}"#);
        let b = manifest(r#"{"dependencies": {"b": "2", "a": "1"}}"#);
        assert_eq!(dependency_hash(&a), dependency_hash(&b));
    }

    #[test]
    fn test_dependency_hash_ignores_unrelated_fields() {
        let a = manifest(r#"{"version": "1.0.0", "scripts": {"test": "jest"}}"#);
        let b = manifest(r#"{"version": "2.0.0", "scripts": {"test": "vitest"}}"#);
        assert_eq!(dependency_hash(&a), dependency_hash(&b));
    }

    #[test]
    fn test_dependency_hash_sensitivity() {
        let base = manifest(r#"{"dependencies": {"a": "1"}, "scripts": {"build": "tsc"}, "main": "index.js"}"#);
        let variants = [
            r#"{"dependencies": {"a": "2"}, "scripts": {"build": "tsc"}, "main": "index.js"}"#,
            r#"{"dependencies": {"a": "1"}, "devDependencies": {"x": "1"}, "scripts": {"build": "tsc"}, "main": "index.js"}"#,
            r#"{"dependencies": {"a": "1"}, "peerDependencies": {"x": "1"}, "scripts": {"build": "tsc"}, "main": "index.js"}"#,
            r#"{"dependencies": {"a": "1"}, "scripts": {"build": "tsc -p ."}, "main": "index.js"}"#,
            r#"{"dependencies": {"a": "1"}, "scripts": {"build": "tsc"}, "main": "lib.js"}"#,
            r#"{"dependencies": {"a": "1"}, "scripts": {"build": "tsc"}, "main": "index.js", "module": "index.mjs"}"#,
            r#"{"dependencies": {"a": "1"}, "scripts": {"build": "tsc"}, "main": "index.js", "types": "index.d.ts"}"#,
        ];

        let base_hash = dependency_hash(&base);
        for variant in variants {
            assert_ne!(base_hash, dependency_hash(&manifest(variant)), "{variant}");
        }
    }

    #[test]
    fn test_capture_without_manifest() {
        let temp = TempDir::new().unwrap();
        let snapshot = MetadataSnapshot::capture(temp.path());

        assert_eq!(snapshot.last_modified, 0);
        assert!(snapshot.package_version.is_none());
        assert_eq!(snapshot.dependency_hash, dependency_hash(&PackageManifest::default()));
    }

    #[test]
    fn test_capture_with_corrupt_manifest() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), "{{{").unwrap();

        let snapshot = MetadataSnapshot::capture(temp.path());
        assert!(snapshot.package_version.is_none());
        assert!(snapshot.last_modified > 0);
    }

    #[test]
    fn test_last_modified_takes_newest_important_path() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), "{}").unwrap();
        fs::create_dir(temp.path().join("src")).unwrap();

        let old = SystemTime::now() - Duration::from_secs(3600);
        let pkg = fs::File::options()
            .write(true)
            .open(temp.path().join("package.json"))
            .unwrap();
        pkg.set_modified(old).unwrap();

        let newest = last_modified(temp.path());
        let src_mtime = fs::metadata(temp.path().join("src"))
            .unwrap()
            .modified()
            .unwrap()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        assert_eq!(u128::from(newest), src_mtime);
    }

    #[test]
    fn test_unimportant_files_do_not_affect_last_modified() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), "{}").unwrap();
        let before = last_modified(temp.path());

        fs::write(temp.path().join("README.md"), "docs").unwrap();
        assert_eq!(last_modified(temp.path()), before);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_dependency_hash_ignores_version(
            deps in dependency_map(),
            a in semver_version(),
            b in semver_version(),
        ) {
            let with_version = |version: &str| PackageManifest {
                version: Some(version.to_string()),
                dependencies: deps.clone(),
                ..PackageManifest::default()
            };
            prop_assert_eq!(
                dependency_hash(&with_version(&a)),
                dependency_hash(&with_version(&b))
            );
        }

        #[test]
        fn test_dependency_hash_sees_added_dependency(
            deps in dependency_map(),
            extra in bare_package_name(),
        ) {
            prop_assume!(!deps.contains_key(&extra));
            let before = PackageManifest {
                dependencies: deps.clone(),
                ..PackageManifest::default()
            };
            let mut after = before.clone();
            after.dependencies.insert(extra, "*".to_string());
            prop_assert_ne!(dependency_hash(&before), dependency_hash(&after));
        }
    }
}
