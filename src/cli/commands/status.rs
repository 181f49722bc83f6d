//! CLI command for `localsync status`
//!
//! Dry-run change detection: reports what a sync would rebuild without
//! building anything or touching the cache.

use anyhow::Result;

use crate::cli::commands::Context;
use crate::cli::output::{create_spinner, status};
use crate::core::sync::{self, SyncSettings};

/// Execute status command
pub fn execute(context: &Context) -> Result<()> {
    let project = context.load_project()?;
    let global = context.load_global_config()?;
    let settings = SyncSettings::resolve(&global, project.config(), None)?;

    if project.dependencies().is_empty() {
        println!("{} No local dependencies declared in localsync.toml", status::INFO);
        return Ok(());
    }

    let spinner = (!context.quiet).then(|| create_spinner("Checking local dependencies..."));
    let entries = sync::status(&project, &settings.exclude);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let mut errors = 0;
    for entry in entries {
        match entry.result {
            Ok(report) if report.changed => {
                println!("{} {}: CHANGED ({})", status::WARNING, entry.name, report.reason);
            }
            Ok(report) => {
                println!("{} {}: UNCHANGED ({})", status::SUCCESS, entry.name, report.reason);
            }
            Err(e) => {
                errors += 1;
                println!("{} {}: {e}", status::ERROR, entry.name);
            }
        }

        if context.verbose > 0 {
            println!("    source: {}", entry.source_dir.display());
        }
    }

    if errors > 0 {
        anyhow::bail!("{errors} dependencies could not be checked");
    }
    Ok(())
}
