//! Error types for localsync
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Project and global configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Project configuration file not found
    #[error("No localsync.toml found at '{path}'. Declare your local dependencies there first.")]
    NotFound { path: PathBuf },

    /// Failed to read a configuration file
    #[error("Failed to read config file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse a configuration file
    #[error("Failed to parse config file '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Same dependency declared twice
    #[error("Dependency '{name}' is declared more than once")]
    DuplicateDependency { name: String },

    /// Dependency declared with an empty name
    #[error("Dependency declared at '{path}' has an empty name")]
    EmptyName { path: PathBuf },

    /// Unknown package manager name
    #[error("Unknown package manager '{name}' (expected npm, yarn, pnpm or bun)")]
    UnknownPackageManager { name: String },

    /// Invalid exclusion pattern
    #[error("Invalid exclude pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },
}

/// Package manifest (package.json) errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Failed to read the manifest file
    #[error("Failed to read manifest '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Manifest is not valid JSON or has unexpected field types
    #[error("Failed to parse manifest '{path}': {error}")]
    Parse { path: PathBuf, error: String },
}

/// Content fingerprinting errors
///
/// Only a missing or unreadable source root is fatal; individual files that
/// cannot be hashed are recorded on the fingerprint instead.
#[derive(Error, Debug)]
pub enum FingerprintError {
    /// Source directory does not exist or cannot be read
    #[error("Cannot read source directory '{path}': {error}")]
    RootUnreadable { path: PathBuf, error: String },

    /// Source path is not a directory
    #[error("Source path '{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// Exclusion pattern could not be compiled
    #[error("Invalid exclude pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },
}

/// Cache store errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to read a cache record
    #[error("Failed to read cache record for '{name}': {error}")]
    Read { name: String, error: String },

    /// Cache record exists but is corrupt
    #[error("Corrupt cache record for '{name}': {error}")]
    Parse { name: String, error: String },

    /// Failed to write a cache record
    #[error("Failed to write cache record for '{name}': {error}")]
    Write { name: String, error: String },

    /// Failed to remove cache records
    #[error("Failed to remove cache data at '{path}': {error}")]
    Remove { path: PathBuf, error: String },
}

/// Build, pack and install errors for a single dependency
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// Required external tool is not installed
    #[error("'{tool}' not found in PATH")]
    ToolNotFound { tool: String },

    /// Installing the library's own dependencies failed
    #[error("Installing dependencies of '{package}' failed: {error}")]
    Install { package: String, error: String },

    /// The build script failed
    #[error("Build of '{package}' failed: {error}")]
    Build { package: String, error: String },

    /// Packing the tarball failed
    #[error("Packing '{package}' failed: {error}")]
    Pack { package: String, error: String },

    /// Unpacking the tarball into the consumer failed
    #[error("Installing '{package}' into '{target}' failed: {error}")]
    Extract {
        package: String,
        target: PathBuf,
        error: String,
    },
}

/// Failure of a single scheduled task
#[derive(Error, Debug)]
pub enum TaskError {
    /// Source tree could not be fingerprinted
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// Build, pack or install step failed
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// New cache record could not be persisted
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The task's worker thread panicked
    #[error("Task panicked: {message}")]
    Panicked { message: String },
}

/// A task the scheduler could not start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedTask {
    /// Task name
    pub name: String,
    /// Dependencies that never reached a terminal state
    pub waiting_on: Vec<String>,
}

impl std::fmt::Display for BlockedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' waits on [{}]", self.name, self.waiting_on.join(", "))
    }
}

/// Scheduling errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// No task is ready and none is running, but work remains
    #[error("Scheduler is stuck: {}", .blocked.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Stuck { blocked: Vec<BlockedTask> },

    /// A task handle could not be joined
    #[error("Failed to join task: {error}")]
    Join { error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },
}

/// Top-level error for a sync run
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Cache error outside of a task (e.g. --clean)
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Scheduling error
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// One or more dependencies failed
    #[error("Failed to sync: {}", .failed.join(", "))]
    Failed { failed: Vec<String> },
}
