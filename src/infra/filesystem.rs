//! Filesystem operations
//!
//! Handles file and directory operations.

use std::path::Path;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Write content to a file so readers never observe a partial write
///
/// The content goes to a sibling temporary file first, which is then renamed
/// over the destination.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, content).map_err(|e| FilesystemError::WriteFile {
        path: tmp_path.clone(),
        error: e.to_string(),
    })?;

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        FilesystemError::WriteFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        }
    })
}

/// Resolve a path to an absolute, symlink-free form where possible
///
/// Paths that do not exist yet are resolved through their nearest existing
/// ancestor, so an install directory can be compared before it is created.
pub fn normalize(path: &Path) -> std::path::PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let mut missing = Vec::new();
    let mut current = path;
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            missing.push(name.to_os_string());
        }
        if let Ok(canonical) = parent.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc, part| acc.join(part));
        }
        current = parent;
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a").join("b").join("record.json");

        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_normalize_missing_path_uses_existing_ancestor() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("not").join("there");

        let normalized = normalize(&missing);
        assert!(normalized.is_absolute());
        assert!(normalized.ends_with("not/there"));
        assert!(normalized.starts_with(temp.path().canonicalize().unwrap()));
    }

    #[test]
    fn test_remove_dir_all_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        assert!(remove_dir_all(&temp.path().join("nope")).is_ok());
    }
}
