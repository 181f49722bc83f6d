//! CLI command for `localsync sync`
//!
//! Rebuilds, packs and installs every changed local dependency.

use anyhow::Result;

use crate::cli::commands::Context;
use crate::cli::output::{create_sync_bar, format_outcome, format_summary};
use crate::core::scheduler::{ProgressHook, TaskOutcome};
use crate::core::sync::{sync_with_progress, SyncOptions, SyncSettings};
use crate::infra::executor::PackageManagerExecutor;

/// Flags of the sync command
#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    /// Rebuild everything
    pub force: bool,
    /// Clear cache records first
    pub clean: bool,
    /// Concurrency override
    pub concurrency: Option<usize>,
}

/// Execute sync command
pub async fn execute(context: &Context, args: SyncArgs) -> Result<()> {
    let project = context.load_project()?;
    let global = context.load_global_config()?;
    let settings = SyncSettings::resolve(&global, project.config(), args.concurrency)?;

    if project.dependencies().is_empty() {
        if !context.quiet {
            println!("No local dependencies declared in localsync.toml");
        }
        return Ok(());
    }

    let options = SyncOptions {
        force: args.force,
        clean: args.clean,
        verbose: context.verbose > 0,
        concurrency: settings.concurrency,
        exclude: settings.exclude,
    };
    let executor = PackageManagerExecutor::new(project.root(), project.install_root())
        .with_package_manager(settings.package_manager);

    tracing::info!(
        "Syncing {} dependencies into {}",
        project.dependencies().len(),
        project.install_root().display()
    );

    let bar = (!context.quiet).then(|| create_sync_bar(project.dependencies().len() as u64));
    let hook = bar.clone().map(|bar| {
        Box::new(move |outcome: &TaskOutcome| {
            bar.println(format_outcome(outcome));
            bar.set_message(outcome.name.clone());
            bar.inc(1);
        }) as ProgressHook
    });

    let report = sync_with_progress(&project, executor, &options, hook).await?;

    if let Some(bar) = bar {
        bar.finish_and_clear();
        println!("{}", format_summary(&report));
    }

    report.into_result()?;
    Ok(())
}
