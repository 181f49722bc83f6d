//! Localsync - keep locally developed JavaScript libraries in sync
//!
//! Rebuilds, packs and installs local library sources into a consuming
//! project, skipping every library whose content has not changed since the
//! last successful sync.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Change detection, dependency graph and scheduling
//! - [`infra`] - Infrastructure layer (filesystem, processes, archives)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
