//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use commands::Commands;

/// Localsync - keep local JavaScript libraries in sync with their consumers
///
/// Rebuilds, packs and installs every declared local library whose sources
/// changed since the last sync.
#[derive(Parser, Debug)]
#[command(name = "localsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Consuming project directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let Some(cmd) = self.command else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            return Ok(());
        };

        let project_dir = match self.project {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let context = commands::Context {
            project_dir,
            verbose: self.verbose,
            quiet: self.quiet,
        };

        cmd.run(&context).await
    }
}
