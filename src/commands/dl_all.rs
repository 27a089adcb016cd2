//! # dl-all Command Implementation
//!
//! Loads every migration descriptor found under `--yaml-root` (recursively,
//! `*.yaml`/`*.yml`) and builds one two-commit repository per descriptor in
//! `--output-dir`, using a bounded pool of workers.
//!
//! Descriptors whose output folder already exists are skipped without any
//! network access, so an interrupted run can simply be restarted. The command
//! exits non-zero when any build failed; descriptors skipped because their
//! commit is a root or merge commit do not count as failures.

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;

use migbench_dl::config::CoordinatorConfig;
use migbench_dl::coordinator::{Coordinator, ProgressFn, TaskReport};
use migbench_dl::defaults;
use migbench_dl::loader;
use migbench_dl::output::{format_report, format_summary, OutputConfig};
use migbench_dl::vcs::GitCli;

use super::{require_git, resolve, BranchArgs, RemoteArgs};

/// Download all migrations under a directory of YAML files
#[derive(Args, Debug)]
pub struct DlAllArgs {
    /// Directory containing migration YAML files
    #[arg(long, value_name = "DIR")]
    pub yaml_root: PathBuf,

    /// Directory receiving one repository per migration
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub branches: BranchArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Number of concurrent workers
    #[arg(long, value_name = "N", default_value_t = defaults::MAX_WORKERS)]
    pub max_workers: usize,

    /// Seconds to sleep before every GitHub request
    #[arg(long, value_name = "SECS", default_value_t = defaults::RATE_LIMIT_SECS)]
    pub rate_limit: f64,

    /// Process at most this many migrations
    #[arg(long, value_name = "N")]
    pub max_count: Option<usize>,
}

/// Execute the `dl-all` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `output` - Color settings derived from the global `--color` flag
///
/// # Behavior
/// - The token, branch names and paths are checked before anything is read,
///   so configuration mistakes fail fast with exit code 1.
/// - An empty YAML root is not an error.
/// - One line per finished task is printed as workers report back, above a
///   progress bar on interactive terminals.
/// - Returns an error naming the failure count when any task failed; skips
///   alone still succeed.
pub fn execute(args: DlAllArgs, output: &OutputConfig) -> Result<()> {
    let provider = args.remote.provider()?;
    let build_config = args.branches.build_config()?;
    let yaml_root = resolve(&args.yaml_root, "YAML root")?;
    let output_dir = resolve(&args.output_dir, "output directory")?;

    let descriptors = loader::load(&yaml_root)
        .with_context(|| format!("Failed to load migrations from {}", yaml_root.display()))?;
    if descriptors.is_empty() {
        println!("No migrations found under {}", yaml_root.display());
        return Ok(());
    }
    require_git()?;
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let config = CoordinatorConfig::new(args.max_workers, args.rate_limit, args.max_count);
    let planned = config
        .max_count
        .map_or(descriptors.len(), |max| max.min(descriptors.len()));
    info!(
        "Downloading {} migrations into {}",
        planned,
        output_dir.display()
    );

    let bar = ProgressBar::new(planned as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    let on_report: &ProgressFn<'_> = &|report: &TaskReport| {
        bar.set_message(report.descriptor.to_string());
        bar.inc(1);
        bar.suspend(|| println!("{}", format_report(output, report)));
    };

    let vcs = GitCli;
    let coordinator = Coordinator::new(&provider, &vcs, &build_config, &config);
    let summary = coordinator.run(&descriptors, &output_dir, Some(on_report))?;
    bar.finish_and_clear();

    print!("{}", format_summary(output, &summary));
    if !summary.is_success() {
        bail!("{} of {} migrations failed", summary.failed, summary.total());
    }
    Ok(())
}
