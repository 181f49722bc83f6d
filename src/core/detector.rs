//! Change detection
//!
//! Decides whether a dependency must be rebuilt. The metadata snapshot is a
//! fast path that can prove a change cheaply; it can never prove the absence
//! of one. When it finds nothing, the full content fingerprint decides.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::cache::{CacheRecord, CacheStore};
use crate::core::fingerprint::{Fingerprint, Fingerprinter};
use crate::core::snapshot::MetadataSnapshot;
use crate::error::{CacheError, FingerprintError};

/// Why a dependency was or was not considered changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeReason {
    /// Caller asked to rebuild regardless
    Forced,
    /// Never synced before
    NoRecord,
    /// Stored record could not be read or parsed
    CacheUnreadable { error: String },
    /// Manifest version differs
    VersionChanged {
        from: Option<String>,
        to: Option<String>,
    },
    /// Dependency sets, build script or entry points differ
    DependenciesChanged,
    /// An important file or directory is newer than at last sync
    FilesModified,
    /// Fast path found nothing but file contents differ
    ContentChanged,
    /// Nothing differs
    Unchanged,
}

impl ChangeReason {
    /// Whether this reason means a rebuild is needed
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forced => write!(f, "forced rebuild"),
            Self::NoRecord => write!(f, "no previous cache record"),
            Self::CacheUnreadable { .. } => write!(f, "error reading cached metadata"),
            Self::VersionChanged { .. } => write!(f, "version changed"),
            Self::DependenciesChanged => write!(f, "dependencies or build config changed"),
            Self::FilesModified => write!(f, "important files modified"),
            Self::ContentChanged => write!(f, "content changed"),
            Self::Unchanged => write!(f, "no changes detected"),
        }
    }
}

/// Result of checking one dependency
///
/// Always carries the freshly computed fingerprint and snapshot so the
/// caller can persist them after a successful rebuild.
#[derive(Debug, Clone)]
pub struct ChangeReport {
    /// Whether a rebuild is needed
    pub changed: bool,
    /// Why
    pub reason: ChangeReason,
    /// Current content fingerprint
    pub fingerprint: Fingerprint,
    /// Current metadata snapshot
    pub metadata: MetadataSnapshot,
}

/// Compare a stored snapshot with the current one
///
/// Returns the first difference found, or `None` when the fast path is
/// inconclusive.
pub fn compare_snapshots(
    stored: &MetadataSnapshot,
    current: &MetadataSnapshot,
) -> Option<ChangeReason> {
    if stored.package_version != current.package_version {
        return Some(ChangeReason::VersionChanged {
            from: stored.package_version.clone(),
            to: current.package_version.clone(),
        });
    }
    if stored.dependency_hash != current.dependency_hash {
        return Some(ChangeReason::DependenciesChanged);
    }
    if current.last_modified > stored.last_modified {
        return Some(ChangeReason::FilesModified);
    }
    None
}

/// Checks dependencies against the cache store
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    store: CacheStore,
    install_root: Option<PathBuf>,
    extra_excludes: Vec<String>,
}

impl ChangeDetector {
    /// Create a detector reading and writing `store`
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            install_root: None,
            extra_excludes: Vec::new(),
        }
    }

    /// Set the consumer's install directory (e.g. `<project>/node_modules`)
    #[must_use]
    pub fn with_install_root(mut self, install_root: PathBuf) -> Self {
        self.install_root = Some(install_root);
        self
    }

    /// Add exclusion globs on top of the defaults
    #[must_use]
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.extra_excludes = excludes;
        self
    }

    /// The underlying store
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Fingerprinter for one dependency's source tree
    fn fingerprinter(&self, name: &str, source_dir: &Path) -> Result<Fingerprinter, FingerprintError> {
        let install_dir = self.install_root.as_ref().map(|root| root.join(name));
        Fingerprinter::for_source(source_dir, install_dir.as_deref(), &self.extra_excludes)
    }

    /// Current content fingerprint of `name` at `source_dir`
    pub fn fingerprint(&self, name: &str, source_dir: &Path) -> Result<Fingerprint, FingerprintError> {
        self.fingerprinter(name, source_dir)?.fingerprint(source_dir)
    }

    /// Decide whether `name` at `source_dir` changed since its last sync
    ///
    /// With `force` the verdict is always CHANGED, but the fingerprint and
    /// snapshot are still computed. Cache problems degrade to CHANGED; only
    /// an unreadable source tree is an error.
    pub fn detect(
        &self,
        name: &str,
        source_dir: &Path,
        force: bool,
    ) -> Result<ChangeReport, FingerprintError> {
        let metadata = MetadataSnapshot::capture(source_dir);

        // Fast-path verdict, and the stored composite to fall back on when
        // the fast path is inconclusive.
        let (verdict, stored_fingerprint) = if force {
            (Some(ChangeReason::Forced), None)
        } else {
            match self.store.read(name) {
                Ok(None) => (Some(ChangeReason::NoRecord), None),
                Ok(Some(record)) => (
                    compare_snapshots(&record.metadata, &metadata),
                    Some(record.fingerprint),
                ),
                Err(e) => {
                    tracing::warn!("{e}; treating '{name}' as changed");
                    (
                        Some(ChangeReason::CacheUnreadable {
                            error: e.to_string(),
                        }),
                        None,
                    )
                }
            }
        };

        // Computed even when the verdict is known, so the report always
        // carries it.
        let fingerprint = self.fingerprint(name, source_dir)?;
        if !fingerprint.unreadable().is_empty() {
            tracing::warn!(
                "{name}: {} file(s) could not be read: {}",
                fingerprint.unreadable().len(),
                fingerprint.unreadable().join(", ")
            );
        }

        let reason = match (verdict, stored_fingerprint) {
            (Some(reason), _) => reason,
            (None, Some(stored)) if stored == fingerprint.composite() => ChangeReason::Unchanged,
            (None, _) => ChangeReason::ContentChanged,
        };
        tracing::debug!("{name}: {reason}");

        Ok(ChangeReport {
            changed: reason.is_changed(),
            reason,
            fingerprint,
            metadata,
        })
    }

    /// Store a new record for `name`
    pub fn persist(
        &self,
        name: &str,
        fingerprint: &Fingerprint,
        metadata: MetadataSnapshot,
    ) -> Result<(), CacheError> {
        self.store.write(
            name,
            &CacheRecord {
                fingerprint: fingerprint.composite().to_string(),
                metadata,
            },
        )
    }
}
