//! Persisted cache records
//!
//! One JSON file per dependency under `<project>/.localsync/cache`, holding
//! the fingerprint composite and metadata snapshot from the last successful
//! sync. Both halves live in the same file and are written atomically, so
//! they can never disagree.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::defaults::{CACHE_SUBDIR, STATE_DIR};
use crate::core::snapshot::MetadataSnapshot;
use crate::error::CacheError;
use crate::infra::filesystem;

/// Last known state of one dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Fingerprint composite string
    pub fingerprint: String,
    /// Metadata snapshot
    pub metadata: MetadataSnapshot,
}

/// Cache information
#[derive(Debug)]
pub struct CacheInfo {
    /// Cache directory path
    pub path: PathBuf,
    /// Total size in bytes
    pub size_bytes: u64,
    /// Number of cached records
    pub item_count: usize,
    /// Whether cache exists
    pub exists: bool,
}

impl CacheInfo {
    /// Format size for display
    pub fn format_size(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Format a byte count for display
#[allow(clippy::cast_precision_loss)]
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        "0 bytes".to_string()
    } else if size_bytes < 1024 {
        format!("{size_bytes} bytes")
    } else if size_bytes < 1024 * 1024 {
        format!("{:.1} KB", size_bytes as f64 / 1024.0)
    } else if size_bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", size_bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", size_bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Get the cache directory for a consuming project
pub fn get_cache_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR).join(CACHE_SUBDIR)
}

/// File-backed store of [`CacheRecord`]s keyed by dependency name
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Store rooted at an explicit directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Store for a consuming project
    pub fn for_project(project_dir: &Path) -> Self {
        Self::new(get_cache_dir(project_dir))
    }

    /// Cache directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record file for `name`
    ///
    /// Scoped names (`@scope/pkg`) are flattened so every record is a direct
    /// child of the cache directory.
    pub fn record_path(&self, name: &str) -> PathBuf {
        let key = name.replace('/', "__");
        self.root.join(format!("{key}.json"))
    }

    /// Read the record for `name`
    ///
    /// `Ok(None)` when no record exists; an error when it exists but cannot
    /// be read or parsed.
    pub fn read(&self, name: &str) -> Result<Option<CacheRecord>, CacheError> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| CacheError::Read {
            name: name.to_string(),
            error: e.to_string(),
        })?;

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CacheError::Parse {
                name: name.to_string(),
                error: e.to_string(),
            })
    }

    /// Replace the record for `name`
    pub fn write(&self, name: &str, record: &CacheRecord) -> Result<(), CacheError> {
        let content = serde_json::to_string_pretty(record).map_err(|e| CacheError::Write {
            name: name.to_string(),
            error: e.to_string(),
        })?;

        filesystem::write_atomic(&self.record_path(name), &content).map_err(|e| {
            CacheError::Write {
                name: name.to_string(),
                error: e.to_string(),
            }
        })
    }

    /// Delete the record for `name`, returning whether one existed
    pub fn remove(&self, name: &str) -> Result<bool, CacheError> {
        let path = self.record_path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Remove {
                path,
                error: e.to_string(),
            }),
        }
    }

    /// Delete the records for every name given, returning how many existed
    pub fn clear<'a, I>(&self, names: I) -> Result<usize, CacheError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut removed = 0;
        for name in names {
            if self.remove(name)? {
                tracing::debug!("Cleared cache record for {name}");
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete the whole cache directory, returning the bytes freed
    pub fn clean_all(&self) -> Result<u64, CacheError> {
        if !self.root.exists() {
            return Ok(0);
        }

        let size_before = calculate_dir_size(&self.root);
        filesystem::remove_dir_all(&self.root).map_err(|e| CacheError::Remove {
            path: self.root.clone(),
            error: e.to_string(),
        })?;

        Ok(size_before)
    }

    /// Get cache information
    pub fn info(&self) -> CacheInfo {
        CacheInfo {
            path: self.root.clone(),
            size_bytes: calculate_dir_size(&self.root),
            item_count: count_records(&self.root),
            exists: self.root.exists(),
        }
    }
}

/// Calculate directory size recursively
fn calculate_dir_size(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Count record files in the cache directory
fn count_records(path: &Path) -> usize {
    if !path.exists() {
        return 0;
    }

    walkdir::WalkDir::new(path)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .count()
}
