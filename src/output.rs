//! # Output Configuration
//!
//! Controls how the CLI prints results: whether color and emoji markers are
//! used, and how a batch [`Summary`] is rendered for humans.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;
use std::fmt::Write;

use crate::coordinator::{Summary, TaskReport, TaskStatus};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the global `--color` flag: "always",
    ///   "never" or "auto" (case-insensitive)
    ///
    /// # Behavior
    /// - `--color=always`: Force colors on (overrides `NO_COLOR`)
    /// - `--color=never`: Force colors off
    /// - `--color=auto`: Detect based on environment
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` is set (any value, including empty)
    /// - `CLICOLOR=0`
    /// - `TERM=dumb`
    /// - stdout is not a color-capable terminal, unless `CLICOLOR_FORCE` is
    ///   set to a non-zero value
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // presence alone disables, even when empty
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain alternative
/// otherwise.
///
/// # Arguments
/// * `config` - The output configuration
/// * `emoji_str` - The marker printed on color terminals
/// * `plain` - The bracketed marker printed everywhere else
///
/// # Example
/// ```rust,ignore
/// let marker = emoji(&config, "✅", "[OK]");
/// println!("{} acme/widgets@deadbeef", marker);
/// ```
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Status marker for one task report: `[OK]`, `[EXISTS]`, `[SKIP]` or
/// `[FAIL]` in plain output.
pub fn status_marker(config: &OutputConfig, status: &TaskStatus) -> &'static str {
    match status {
        TaskStatus::Published => emoji(config, "✅", "[OK]"),
        TaskStatus::AlreadyPresent => emoji(config, "⏭️", "[EXISTS]"),
        TaskStatus::Skipped(_) => emoji(config, "⚠️", "[SKIP]"),
        TaskStatus::Failed(_) => emoji(config, "❌", "[FAIL]"),
    }
}

/// One line describing a task report.
///
/// Published and already-present tasks show the repository path; skipped
/// and failed tasks show the reason instead.
///
/// # Example
/// ```text
/// [OK] acme/widgets@deadbeef -> /out/acme_widgets__deadbeef
/// [FAIL] acme/gadgets@0123abcd: Not found: acme/gadgets@0123abcd
/// ```
pub fn format_report(config: &OutputConfig, report: &TaskReport) -> String {
    let marker = status_marker(config, &report.status);
    match &report.status {
        TaskStatus::Published | TaskStatus::AlreadyPresent => format!(
            "{} {} -> {}",
            marker,
            report.descriptor,
            report.target.display()
        ),
        TaskStatus::Skipped(reason) | TaskStatus::Failed(reason) => {
            format!("{} {}: {}", marker, report.descriptor, reason)
        }
    }
}

/// Multi-line summary of a batch run.
///
/// # Arguments
/// * `config` - The output configuration
/// * `summary` - The result of [`crate::coordinator::Coordinator::run`]
///
/// # Behavior
/// Skipped and failed tasks are repeated one per line, in descriptor order,
/// so they stay visible after the per-task progress output has scrolled by.
/// The last line carries the counts for every outcome. Successful tasks are
/// not repeated.
pub fn format_summary(config: &OutputConfig, summary: &Summary) -> String {
    let mut out = String::new();
    for report in &summary.reports {
        if matches!(
            report.status,
            TaskStatus::Skipped(_) | TaskStatus::Failed(_)
        ) {
            let _ = writeln!(out, "{}", format_report(config, report));
        }
    }
    let _ = writeln!(
        out,
        "{} {} tasks: {} published, {} already present, {} skipped, {} failed",
        emoji(config, "📦", "[SUMMARY]"),
        summary.total(),
        summary.published,
        summary.already_present,
        summary.skipped,
        summary.failed
    );
    out
}
