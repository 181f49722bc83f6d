//! CLI command for `localsync graph`
//!
//! Prints the order a sync would process the declared dependencies in.

use anyhow::Result;

use crate::cli::commands::Context;
use crate::core::graph::{build_task_nodes, ExecutionPlan};

/// Execute graph command
pub fn execute(context: &Context) -> Result<()> {
    let project = context.load_project()?;
    let plan = ExecutionPlan::new(&build_task_nodes(&project));

    println!("{}", plan.format());
    Ok(())
}
