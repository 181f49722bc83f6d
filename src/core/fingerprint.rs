//! Content fingerprinting
//!
//! Walks a library's source tree and hashes every included file. The
//! resulting composite string is the authoritative change signal: it is
//! built from sorted relative paths only, so it is stable across runs,
//! machines and traversal orders.

use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::{Component, Path};
use walkdir::WalkDir;

use crate::config::defaults::{DEFAULT_EXCLUDES, ROOT_EXCLUDES, UNREADABLE_SENTINEL};
use crate::error::FingerprintError;
use crate::infra::filesystem;

/// Hash of one file in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Path relative to the fingerprinted root, `/`-separated
    pub path: String,
    /// Hex SHA-256 of the file content, or [`UNREADABLE_SENTINEL`]
    pub hash: String,
}

/// Digest of a directory tree
#[derive(Debug, Clone)]
pub struct Fingerprint {
    files: Vec<FileDigest>,
    composite: String,
    unreadable: Vec<String>,
}

impl Fingerprint {
    /// Build a fingerprint from per-file digests in any order
    pub fn from_digests(mut files: Vec<FileDigest>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut composite = String::new();
        for file in &files {
            composite.push_str(&file.hash);
            composite.push(' ');
            composite.push_str(&file.path);
            composite.push('\n');
        }

        let unreadable = files
            .iter()
            .filter(|f| f.hash == UNREADABLE_SENTINEL)
            .map(|f| f.path.clone())
            .collect();

        Self {
            files,
            composite,
            unreadable,
        }
    }

    /// Included files in sorted path order
    pub fn files(&self) -> &[FileDigest] {
        &self.files
    }

    /// The `"<hash> <path>\n"` composite used for comparison and storage
    pub fn composite(&self) -> &str {
        &self.composite
    }

    /// Files that could not be hashed
    pub fn unreadable(&self) -> &[String] {
        &self.unreadable
    }

    /// Number of included files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file was included
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.composite == other.composite
    }
}

impl Eq for Fingerprint {}

/// Compiled set of exclusion globs
///
/// Patterns come in two kinds: ones matched against every path component,
/// and root patterns matched only against the first one.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    anywhere: GlobSet,
    rooted: GlobSet,
    patterns: Vec<String>,
    rooted_patterns: Vec<String>,
}

fn compile(patterns: &[String]) -> Result<GlobSet, FingerprintError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| FingerprintError::InvalidPattern {
            pattern: pattern.clone(),
            error: e.to_string(),
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map_err(|e| FingerprintError::InvalidPattern {
            pattern: patterns.join(", "),
            error: e.to_string(),
        })
}

impl ExclusionSet {
    /// Compile the given patterns, each matching at any depth
    pub fn new<I, S>(patterns: I) -> Result<Self, FingerprintError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        Ok(Self {
            anywhere: compile(&patterns)?,
            rooted: GlobSet::empty(),
            patterns,
            rooted_patterns: Vec::new(),
        })
    }

    /// Add patterns matched only against the first path component
    pub fn with_root_patterns<I, S>(mut self, patterns: I) -> Result<Self, FingerprintError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rooted_patterns.extend(patterns.into_iter().map(Into::into));
        self.rooted = compile(&self.rooted_patterns)?;
        Ok(self)
    }

    /// Built-in exclusions followed by `extra`
    pub fn with_defaults(extra: &[String]) -> Result<Self, FingerprintError> {
        Self::new(
            DEFAULT_EXCLUDES
                .iter()
                .map(|p| (*p).to_string())
                .chain(extra.iter().cloned()),
        )?
        .with_root_patterns(ROOT_EXCLUDES.iter().copied())
    }

    /// Patterns matched at any depth
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Patterns matched only at the root
    pub fn root_patterns(&self) -> &[String] {
        &self.rooted_patterns
    }

    /// Whether a relative path is excluded
    pub fn is_excluded(&self, relative: &Path) -> bool {
        if self.anywhere.is_match(relative) || self.rooted.is_match(relative) {
            return true;
        }
        relative
            .components()
            .enumerate()
            .any(|(depth, c)| match c {
                Component::Normal(name) => {
                    self.anywhere.is_match(name) || (depth == 0 && self.rooted.is_match(name))
                }
                _ => false,
            })
    }
}

/// Top-level folder of `install_dir` relative to `source_dir`, if nested
///
/// Used to keep a library from fingerprinting its own installed output when
/// the consuming project lives inside the library's tree.
pub fn nested_install_exclusion(source_dir: &Path, install_dir: &Path) -> Option<String> {
    let source = filesystem::normalize(source_dir);
    let install = filesystem::normalize(install_dir);

    let relative = install.strip_prefix(&source).ok()?;
    match relative.components().next()? {
        Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
        _ => None,
    }
}

/// Computes [`Fingerprint`]s for source trees
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    exclusions: ExclusionSet,
}

impl Fingerprinter {
    /// Create a fingerprinter with an explicit exclusion set
    pub fn new(exclusions: ExclusionSet) -> Self {
        Self { exclusions }
    }

    /// Create a fingerprinter for one library
    ///
    /// Combines the default exclusions, `extra` patterns and, when the
    /// install directory sits inside the source tree, its top-level folder.
    pub fn for_source(
        source_dir: &Path,
        install_dir: Option<&Path>,
        extra: &[String],
    ) -> Result<Self, FingerprintError> {
        let mut exclusions = ExclusionSet::with_defaults(extra)?;
        if let Some(folder) = install_dir.and_then(|dir| nested_install_exclusion(source_dir, dir)) {
            tracing::debug!(
                "Excluding nested install folder '{folder}' from {}",
                source_dir.display()
            );
            exclusions = exclusions.with_root_patterns([globset::escape(&folder)])?;
        }
        Ok(Self::new(exclusions))
    }

    /// Exclusions in effect
    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Fingerprint the tree rooted at `root`
    pub fn fingerprint(&self, root: &Path) -> Result<Fingerprint, FingerprintError> {
        let metadata = std::fs::metadata(root).map_err(|e| FingerprintError::RootUnreadable {
            path: root.to_path_buf(),
            error: e.to_string(),
        })?;
        if !metadata.is_dir() {
            return Err(FingerprintError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || entry
                        .path()
                        .strip_prefix(root)
                        .map_or(true, |rel| !self.exclusions.is_excluded(rel))
            });

        let mut digests = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        continue;
                    }
                    let Some(relative) = relative_key(root, entry.path()) else {
                        continue;
                    };
                    let hash = if entry.path_is_symlink() {
                        hash_symlink(entry.path())
                    } else {
                        hash_file(entry.path())
                    };
                    digests.push(FileDigest {
                        path: relative,
                        hash: hash.unwrap_or_else(|e| {
                            tracing::warn!("Cannot hash {}: {e}", entry.path().display());
                            UNREADABLE_SENTINEL.to_string()
                        }),
                    });
                }
                Err(e) => {
                    // Directory we could not list, or a file that vanished
                    // between listing and stat.
                    let Some(relative) = e.path().and_then(|p| relative_key(root, p)) else {
                        tracing::warn!("Skipping unreadable entry under {}: {e}", root.display());
                        continue;
                    };
                    tracing::warn!("Cannot read {relative}: {e}");
                    digests.push(FileDigest {
                        path: relative,
                        hash: UNREADABLE_SENTINEL.to_string(),
                    });
                }
            }
        }

        let fingerprint = Fingerprint::from_digests(digests);
        tracing::debug!(
            "Fingerprinted {} files under {}",
            fingerprint.len(),
            root.display()
        );
        Ok(fingerprint)
    }
}

/// `/`-joined path of `path` relative to `root`
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn hash_symlink(path: &Path) -> std::io::Result<String> {
    let target = std::fs::read_link(path)?;
    let mut hasher = Sha256::new();
    hasher.update(b"symlink:");
    hasher.update(target.to_string_lossy().as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
