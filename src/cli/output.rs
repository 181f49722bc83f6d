//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status lines, and formatted messages to the user.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::scheduler::{RunReport, TaskOutcome, TaskStatus};

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Create a progress bar counting synced dependencies
pub fn create_sync_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} dependencies ({msg})")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";

    /// Skipped prefix
    pub const SKIPPED: &str = "•";
}

/// One-line summary of a task outcome
pub fn format_outcome(outcome: &TaskOutcome) -> String {
    let elapsed = format_duration(outcome.duration);
    match &outcome.status {
        TaskStatus::Updated { reason } => {
            format!("{} {} updated ({reason}) in {elapsed}", status::SUCCESS, outcome.name)
        }
        TaskStatus::Unchanged { reason } => {
            format!("{} {} unchanged ({reason})", status::SKIPPED, outcome.name)
        }
        TaskStatus::Failed { error } => {
            format!("{} {} failed: {error}", status::ERROR, outcome.name)
        }
        TaskStatus::NotAttempted => {
            format!("{} {} not attempted", status::WARNING, outcome.name)
        }
    }
}

/// Closing summary of a run
///
/// Failed libraries are listed on their own line, apart from the skipped
/// ones, so they are easy to spot.
pub fn format_summary(report: &RunReport) -> String {
    let mut lines = vec![format!(
        "{} updated, {} unchanged, {} failed",
        report.updated().len(),
        report.unchanged().len(),
        report.failed().len()
    )];

    if !report.updated().is_empty() {
        lines.push(format!("Replaced: {}", report.updated().join(", ")));
    }
    if !report.failed().is_empty() {
        lines.push(format!("{} Failed: {}", status::ERROR, report.failed().join(", ")));
    }
    if !report.not_attempted().is_empty() {
        lines.push(format!(
            "{} Not attempted: {}",
            status::WARNING,
            report.not_attempted().join(", ")
        ));
    }
    for edge in &report.dropped_edges {
        lines.push(format!(
            "{} Circular dependency: ignored {} -> {}",
            status::WARNING,
            edge.from,
            edge.to
        ));
    }

    lines.join("\n")
}

/// Human-readable duration
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}
