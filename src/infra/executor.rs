//! Build, pack and install of a single library
//!
//! The scheduler only decides *when* a library is processed. Everything that
//! touches the library's toolchain and the consumer's install directory goes
//! through an [`Executor`].

use std::fs::File;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};

use crate::config::defaults::{STATE_DIR, TARBALLS_SUBDIR};
use crate::core::graph::TaskNode;
use crate::core::manifest::PackageManifest;
use crate::error::ExecutorError;
use crate::infra::filesystem;
use crate::infra::package_manager::{ensure_tool, PackageManager};

/// Rebuilds one library and installs it into the consumer
pub trait Executor: Send + Sync + 'static {
    /// Build, pack and install `task`
    ///
    /// Blocking; called from the blocking thread pool.
    fn execute(&self, task: &TaskNode) -> Result<(), ExecutorError>;
}

/// Default executor driving the library's package manager
///
/// 1. `<pm> install` when the library has no `node_modules` yet
/// 2. `<pm> run build` when the manifest declares a build script
/// 3. `npm pack` into `<project>/.localsync/tarballs/<name>`
/// 4. unpack the tarball into `<install_root>/<name>`, replacing any
///    previous install
#[derive(Debug, Clone)]
pub struct PackageManagerExecutor {
    install_root: PathBuf,
    tarball_root: PathBuf,
    package_manager: Option<PackageManager>,
}

impl PackageManagerExecutor {
    /// Executor installing into `install_root` for the project at `project_root`
    pub fn new(project_root: &Path, install_root: PathBuf) -> Self {
        Self {
            install_root,
            tarball_root: project_root.join(STATE_DIR).join(TARBALLS_SUBDIR),
            package_manager: None,
        }
    }

    /// Use this package manager instead of detecting one per library
    #[must_use]
    pub fn with_package_manager(mut self, package_manager: Option<PackageManager>) -> Self {
        self.package_manager = package_manager;
        self
    }

    /// Where the tarball for `name` is packed
    pub fn tarball_dir(&self, name: &str) -> PathBuf {
        self.tarball_root.join(name.replace('/', "__"))
    }

    /// Where `name` is installed in the consumer
    pub fn install_dir(&self, name: &str) -> PathBuf {
        self.install_root.join(name)
    }

    fn pack(&self, task: &TaskNode) -> Result<PathBuf, ExecutorError> {
        let pack_error = |error: String| ExecutorError::Pack {
            package: task.name.clone(),
            error,
        };

        let npm = ensure_tool("npm")?;
        let destination = self.tarball_dir(&task.name);
        filesystem::remove_dir_all(&destination).map_err(|e| pack_error(e.to_string()))?;
        filesystem::create_dir_all(&destination).map_err(|e| pack_error(e.to_string()))?;

        tracing::info!("{}: packing", task.name);
        let destination_arg = destination.to_string_lossy();
        run(
            &npm,
            &["pack", "--pack-destination", &*destination_arg],
            &task.source_dir,
        )
        .map_err(pack_error)?;

        find_tarball(&destination).map_err(pack_error)
    }

    fn install(&self, task: &TaskNode, tarball: &Path) -> Result<(), ExecutorError> {
        let target = self.install_dir(&task.name);
        tracing::info!("{}: installing into {}", task.name, target.display());

        filesystem::remove_dir_all(&target)
            .map_err(|e| e.to_string())
            .and_then(|()| extract_package(tarball, &target))
            .map_err(|error| ExecutorError::Extract {
                package: task.name.clone(),
                target,
                error,
            })
    }
}

impl Executor for PackageManagerExecutor {
    fn execute(&self, task: &TaskNode) -> Result<(), ExecutorError> {
        let pm = PackageManager::resolve(self.package_manager, &task.source_dir);
        let pm_path = pm.ensure_available()?;
        tracing::debug!("{}: using {pm}", task.name);

        install_own_dependencies(&pm_path, task)?;
        build(&pm_path, task)?;
        let tarball = self.pack(task)?;
        self.install(task, &tarball)
    }
}

/// `<pm> install` unless the library already has its dependencies
fn install_own_dependencies(
    pm_path: &Path,
    task: &TaskNode,
) -> Result<(), ExecutorError> {
    if task.source_dir.join("node_modules").is_dir() {
        return Ok(());
    }

    tracing::info!("{}: installing its dependencies", task.name);
    run(pm_path, &["install"], &task.source_dir).map_err(|error| ExecutorError::Install {
        package: task.name.clone(),
        error,
    })
}

/// `<pm> run build` when the manifest declares a build script
fn build(pm_path: &Path, task: &TaskNode) -> Result<(), ExecutorError> {
    let has_build_script = match PackageManifest::load(&task.source_dir) {
        Ok(manifest) => manifest.is_some_and(|m| m.build_script().is_some()),
        Err(e) => {
            tracing::warn!("{e}; skipping build step");
            false
        }
    };
    if !has_build_script {
        tracing::debug!("{}: no build script", task.name);
        return Ok(());
    }

    tracing::info!("{}: building", task.name);
    run(pm_path, &["run", "build"], &task.source_dir).map_err(|error| ExecutorError::Build {
        package: task.name.clone(),
        error,
    })
}

/// Run `program` in `cwd`, returning stderr on failure
fn run(program: &Path, args: &[&str], cwd: &Path) -> Result<(), String> {
    tracing::debug!(
        "Running {} {} in {}",
        program.display(),
        args.join(" "),
        cwd.display()
    );

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| format!("failed to start {}: {e}", program.display()))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(format!("{} ({})", output.status, stderr.trim()))
}

/// The single `.tgz` file in `dir`
///
/// [`PackageManagerExecutor::pack`] empties the directory before packing, so
/// more than one tarball means something else wrote there.
fn find_tarball(dir: &Path) -> Result<PathBuf, String> {
    let entries = std::fs::read_dir(dir).map_err(|e| format!("{}: {e}", dir.display()))?;
    let mut tarballs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "tgz"))
        .collect();

    match tarballs.len() {
        0 => Err(format!("no tarball produced in '{}'", dir.display())),
        1 => Ok(tarballs.remove(0)),
        n => Err(format!("expected one tarball in '{}', found {n}", dir.display())),
    }
}

/// Whether every component of `path` stays below the directory it is
/// joined onto
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Unpack an npm tarball into `target`
///
/// npm puts every entry under a top-level `package/` folder; that prefix is
/// stripped. Entries escaping the target are rejected, as are hard links and
/// symlinks pointing outside of it.
pub fn extract_package(tarball: &Path, target: &Path) -> Result<(), String> {
    let file = File::open(tarball).map_err(|e| format!("{}: {e}", tarball.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    filesystem::create_dir_all(target).map_err(|e| e.to_string())?;
    let root = std::fs::canonicalize(target).map_err(|e| format!("{}: {e}", target.display()))?;

    for entry in archive.entries().map_err(|e| e.to_string())? {
        let mut entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path().map_err(|e| e.to_string())?.into_owned();
        let relative = path.strip_prefix("package").unwrap_or(&path);

        if relative.as_os_str().is_empty() {
            continue;
        }
        if !is_contained(relative) {
            return Err(format!("refusing to unpack '{}'", path.display()));
        }

        match entry.header().entry_type() {
            EntryType::Link => {
                return Err(format!("refusing to unpack hard link '{}'", path.display()));
            }
            EntryType::Symlink => {
                let link = entry
                    .link_name()
                    .map_err(|e| e.to_string())?
                    .unwrap_or_default();
                if link.is_absolute() || !is_contained(&link) {
                    return Err(format!(
                        "refusing to unpack '{}' linking to '{}'",
                        path.display(),
                        link.display()
                    ));
                }
            }
            _ => {}
        }

        let destination = target.join(relative);
        if let Some(parent) = destination.parent() {
            filesystem::create_dir_all(parent).map_err(|e| e.to_string())?;
            let parent = std::fs::canonicalize(parent).map_err(|e| e.to_string())?;
            if !parent.starts_with(&root) {
                return Err(format!("refusing to unpack '{}'", path.display()));
            }
        }
        entry
            .unpack(&destination)
            .map_err(|e| format!("{}: {e}", relative.display()))?;
    }

    Ok(())
}
