//! Core business logic module
//!
//! Change detection, dependency ordering and scheduling. Process spawning
//! and archive handling live in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`project`] - Consuming project configuration (localsync.toml)
//! - [`global_config`] - Global configuration management
//! - [`manifest`] - Library manifest (package.json) reading
//! - [`fingerprint`] - Content fingerprinting of a source tree
//! - [`snapshot`] - Cheap metadata snapshot of a library
//! - [`cache`] - Persisted per-library cache records
//! - [`detector`] - Change detection against the cache
//! - [`graph`] - Dependency graph and processing order
//! - [`scheduler`] - Dependency-aware concurrent task execution
//! - [`sync`] - Orchestration of a full sync run

pub mod cache;
pub mod detector;
pub mod fingerprint;
pub mod global_config;
pub mod graph;
pub mod manifest;
pub mod project;
pub mod scheduler;
pub mod snapshot;
pub mod sync;
