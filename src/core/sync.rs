//! Sync orchestration
//!
//! Ties the pieces together for one run: resolve settings, build the task
//! graph, and drive every declared library through change detection and,
//! when needed, the executor.

use std::path::PathBuf;

use crate::config::defaults::DEFAULT_CONCURRENCY;
use crate::core::detector::{ChangeDetector, ChangeReport};
use crate::core::fingerprint::ExclusionSet;
use crate::core::global_config::GlobalConfig;
use crate::core::graph::{build_task_nodes, ExecutionPlan, TaskNode};
use crate::core::project::{Project, ProjectConfig};
use crate::core::scheduler::{ProgressHook, RunReport, Scheduler, TaskResolution, TaskRunner};
use crate::core::snapshot::MetadataSnapshot;
use crate::error::{ConfigError, FingerprintError, SyncError, TaskError};
use crate::infra::executor::Executor;
use crate::infra::package_manager::PackageManager;

/// Process-wide options for one run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Rebuild everything regardless of detected changes
    pub force: bool,
    /// Drop cache records of the declared libraries before starting
    pub clean: bool,
    /// Log every decision, not only rebuilds
    pub verbose: bool,
    /// Maximum libraries processed at once
    pub concurrency: usize,
    /// Extra fingerprint exclusion globs
    pub exclude: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            force: false,
            clean: false,
            verbose: false,
            concurrency: DEFAULT_CONCURRENCY,
            exclude: Vec::new(),
        }
    }
}

/// Settings merged from the global config, the project config and flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Concurrency ceiling, at least 1
    pub concurrency: usize,
    /// Package manager forced for every library
    pub package_manager: Option<PackageManager>,
    /// Extra exclusion globs, global ones first
    pub exclude: Vec<String>,
}

impl SyncSettings {
    /// Merge the configuration layers; `cli_concurrency` wins over both files
    ///
    /// A concurrency of 0 means one task per CPU.
    pub fn resolve(
        global: &GlobalConfig,
        project: &ProjectConfig,
        cli_concurrency: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let concurrency = match cli_concurrency
            .or(project.options.concurrency)
            .or(global.sync.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY)
        {
            0 => num_cpus::get(),
            n => n,
        };

        let package_manager = project
            .options
            .package_manager
            .as_deref()
            .or(global.sync.package_manager.as_deref())
            .map(str::parse::<PackageManager>)
            .transpose()?;

        let exclude: Vec<String> = global
            .fingerprint
            .exclude
            .iter()
            .chain(&project.options.exclude)
            .cloned()
            .collect();

        ExclusionSet::with_defaults(&exclude).map_err(|e| match e {
            FingerprintError::InvalidPattern { pattern, error } => {
                ConfigError::InvalidPattern { pattern, error }
            }
            other => ConfigError::InvalidPattern {
                pattern: exclude.join(", "),
                error: other.to_string(),
            },
        })?;

        Ok(Self {
            concurrency,
            package_manager,
            exclude,
        })
    }
}

/// Change detector for `project`'s cache and install directory
pub fn detector_for(project: &Project, exclude: &[String]) -> ChangeDetector {
    ChangeDetector::new(project.cache_store())
        .with_install_root(project.install_root())
        .with_excludes(exclude.to_vec())
}

/// Per-library work: detect, rebuild when changed, record the new state
pub struct SyncRunner<E> {
    detector: ChangeDetector,
    executor: E,
    force: bool,
    verbose: bool,
}

impl<E: Executor> SyncRunner<E> {
    /// Create a runner
    pub fn new(detector: ChangeDetector, executor: E, options: &SyncOptions) -> Self {
        Self {
            detector,
            executor,
            force: options.force,
            verbose: options.verbose,
        }
    }
}

impl<E: Executor> TaskRunner for SyncRunner<E> {
    fn run(&self, task: &TaskNode) -> Result<TaskResolution, TaskError> {
        let report = self
            .detector
            .detect(&task.name, &task.source_dir, self.force)?;
        let reason = report.reason.to_string();

        if !report.changed {
            if self.verbose {
                tracing::info!("{}: skipped ({reason})", task.name);
            } else {
                tracing::debug!("{}: skipped ({reason})", task.name);
            }
            return Ok(TaskResolution::Unchanged { reason });
        }

        tracing::info!("{}: rebuilding ({reason})", task.name);
        self.executor.execute(task)?;

        // The build writes into the source tree, so both halves of the
        // record are taken again once it is done.
        let metadata = MetadataSnapshot::capture(&task.source_dir);
        let fingerprint = self.detector.fingerprint(&task.name, &task.source_dir)?;
        self.detector.persist(&task.name, &fingerprint, metadata)?;

        Ok(TaskResolution::Updated { reason })
    }
}

/// Run a sync over every declared library of `project`
pub async fn sync<E: Executor>(
    project: &Project,
    executor: E,
    options: &SyncOptions,
) -> Result<RunReport, SyncError> {
    sync_with_progress(project, executor, options, None).await
}

/// [`sync`], reporting each finished library to `progress`
pub async fn sync_with_progress<E: Executor>(
    project: &Project,
    executor: E,
    options: &SyncOptions,
    progress: Option<ProgressHook>,
) -> Result<RunReport, SyncError> {
    let detector = detector_for(project, &options.exclude);

    if options.clean {
        let removed = detector.store().clear(project.dependency_names())?;
        tracing::info!("Cleared {removed} cache record(s)");
    }

    let nodes = build_task_nodes(project);
    if options.verbose {
        tracing::info!("{}", ExecutionPlan::new(&nodes).format());
    }
    tracing::debug!(
        "Syncing {} librar{} with concurrency {}",
        nodes.len(),
        if nodes.len() == 1 { "y" } else { "ies" },
        options.concurrency
    );

    let runner = SyncRunner::new(detector, executor, options);
    let mut scheduler = Scheduler::new(runner, options.concurrency);
    if let Some(hook) = progress {
        scheduler = scheduler.with_progress(hook);
    }

    Ok(scheduler.run(nodes).await?)
}

/// Dry-run verdict for one library
#[derive(Debug)]
pub struct StatusEntry {
    /// Library name
    pub name: String,
    /// Source directory
    pub source_dir: PathBuf,
    /// Verdict, or why none could be reached
    pub result: Result<ChangeReport, FingerprintError>,
}

/// Change detection for every declared library, without building or
/// writing anything
pub fn status(project: &Project, exclude: &[String]) -> Vec<StatusEntry> {
    let detector = detector_for(project, exclude);

    project
        .dependencies()
        .iter()
        .map(|dep| {
            let source_dir = project.source_dir(dep);
            let result = detector.detect(&dep.name, &source_dir, false);
            StatusEntry {
                name: dep.name.clone(),
                source_dir,
                result,
            }
        })
        .collect()
}
