//! CLI command for `localsync cache`
//!
//! Inspects and clears the per-project cache records.

use anyhow::Result;

use crate::cli::commands::Context;
use crate::core::cache::{format_size, CacheStore};

/// Execute cache info subcommand
pub fn execute_info(context: &Context) -> Result<()> {
    println!("📦 Cache Information\n");

    let info = CacheStore::for_project(&context.project_dir).info();

    println!("Location: {}", info.path.display());
    println!("Size: {}", info.format_size());
    println!("Records: {}", info.item_count);

    if !info.exists {
        println!("\n⚠️  Cache directory does not exist (empty cache)");
    }

    Ok(())
}

/// Execute cache clean subcommand
///
/// Without names, clears the whole cache of the project.
pub fn execute_clean(context: &Context, names: &[String]) -> Result<()> {
    let store = CacheStore::for_project(&context.project_dir);

    if names.is_empty() {
        let size_freed = store.clean_all()?;
        if size_freed > 0 {
            println!("✅ Cache cleared ({} freed)", format_size(size_freed));
        } else {
            println!("✅ Cache was already empty");
        }
        return Ok(());
    }

    let removed = store.clear(names.iter().map(String::as_str))?;
    println!("✅ Cleared {removed} of {} cache record(s)", names.len());
    Ok(())
}
