//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod cache;
pub mod graph;
pub mod status;
pub mod sync;

use anyhow::{Context as _, Result};
use clap::Subcommand;
use std::path::PathBuf;

use crate::core::global_config::GlobalConfig;
use crate::core::project::Project;
use crate::infra::dirs::LocalsyncDirs;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    /// Consuming project root
    pub project_dir: PathBuf,
    /// Verbosity count (`-v`, `-vv`)
    pub verbose: u8,
    /// Suppress everything except errors
    pub quiet: bool,
}

impl Context {
    /// Load `localsync.toml` from the project directory
    pub fn load_project(&self) -> Result<Project> {
        Project::load(&self.project_dir)
            .with_context(|| format!("Failed to load project at '{}'", self.project_dir.display()))
    }

    /// Load the global configuration
    pub fn load_global_config(&self) -> Result<GlobalConfig> {
        GlobalConfig::load(&LocalsyncDirs::new()).context("Failed to load global configuration")
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild and reinstall every changed local dependency
    Sync {
        /// Rebuild everything, ignoring the cache
        #[arg(short, long)]
        force: bool,

        /// Drop cache records of the declared dependencies first
        #[arg(long)]
        clean: bool,

        /// Dependencies processed at once (0 = number of CPUs)
        #[arg(short = 'j', long, env = "LOCALSYNC_CONCURRENCY")]
        concurrency: Option<usize>,
    },

    /// Show which dependencies would be rebuilt, without changing anything
    Status,

    /// Show the processing order of the declared dependencies
    Graph,

    /// Manage the per-project cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache information
    Info,

    /// Clear cache records
    Clean {
        /// Dependencies to clear (all declared ones if omitted)
        names: Vec<String>,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self, context: &Context) -> Result<()> {
        match self {
            Self::Sync {
                force,
                clean,
                concurrency,
            } => {
                let options = sync::SyncArgs {
                    force,
                    clean,
                    concurrency,
                };
                sync::execute(context, options).await
            }
            Self::Status => status::execute(context),
            Self::Graph => graph::execute(context),
            Self::Cache { command } => match command {
                CacheCommands::Info => cache::execute_info(context),
                CacheCommands::Clean { names } => cache::execute_clean(context, &names),
            },
        }
    }
}
