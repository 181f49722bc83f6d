//! Infrastructure layer
//!
//! Handles filesystem helpers, platform directories and external processes.

pub mod dirs;
pub mod executor;
pub mod filesystem;
pub mod package_manager;
