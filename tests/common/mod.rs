//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test workspace
///
/// A temporary directory holding a consuming project in `app/` and local
/// libraries as its siblings, plus an isolated global config directory.
pub struct TestProject {
    /// Temporary directory for the test workspace
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestProject {
    /// Create a new workspace with an empty `app/` project
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        };
        project.create_dir("app");
        project.create_dir("config");
        project
    }

    /// Get the path to the workspace root
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Get the path to the consuming project
    pub fn app_dir(&self) -> PathBuf {
        self.dir.path().join("app")
    }

    /// Create a file in the workspace
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the workspace
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the workspace
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the workspace
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Create a library next to the app with a manifest and one source file
    pub fn add_library(&self, name: &str, version: &str, deps: &[&str]) {
        let dependencies = deps
            .iter()
            .map(|dep| format!(r#""{dep}": "*""#))
            .collect::<Vec<_>>()
            .join(", ");
        self.create_file(
            &format!("{name}/package.json"),
            &format!(
                r#"{{"name": "{name}", "version": "{version}", "main": "src/index.js", "dependencies": {{{dependencies}}}}}"#
            ),
        );
        self.create_file(
            &format!("{name}/src/index.js"),
            &format!("module.exports = '{name}';\n"),
        );
    }

    /// Set a library's version, keeping the rest of its manifest
    pub fn set_version(&self, name: &str, from: &str, to: &str) {
        let path = format!("{name}/package.json");
        let manifest = self.read_file(&path).replace(
            &format!(r#""version": "{from}""#),
            &format!(r#""version": "{to}""#),
        );
        self.create_file(&path, &manifest);
    }

    /// Write `app/localsync.toml` declaring the given sibling libraries
    pub fn write_config(&self, names: &[&str]) {
        let mut config = String::from("[options]\nconcurrency = 1\n");
        for name in names {
            config.push_str(&format!(
                "\n[[dependencies]]\nname = \"{name}\"\npath = \"../{name}\"\n"
            ));
        }
        self.create_file("app/localsync.toml", &config);
    }

    /// Run the localsync binary in the app directory
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_localsync"))
            .current_dir(self.app_dir())
            .env("LOCALSYNC_CONFIG_DIR", self.dir.path().join("config"))
            .env_remove("LOCALSYNC_CONCURRENCY")
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .expect("Failed to execute localsync")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
