//! # dl-single Command Implementation
//!
//! Builds the repository for the one migration described in `--yaml-file`.
//! Unlike `dl-all`, a migration that cannot be built because its commit is a
//! root or merge commit is reported as an error.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use migbench_dl::builder::{BuildOutcome, SnapshotRepoBuilder};
use migbench_dl::loader;
use migbench_dl::output::{emoji, OutputConfig};
use migbench_dl::vcs::GitCli;

use super::{require_git, resolve, BranchArgs, RemoteArgs};

/// Download the migration described by one YAML file
#[derive(Args, Debug)]
pub struct DlSingleArgs {
    /// YAML file describing exactly one migration
    #[arg(long, value_name = "FILE")]
    pub yaml_file: PathBuf,

    /// Directory receiving the repository
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub branches: BranchArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Execute the `dl-single` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `output` - Color settings derived from the global `--color` flag
///
/// # Behavior
/// Exits successfully when the repository is published or already present.
/// Every other outcome, including a root or merge commit, is returned as an
/// error carrying the build stage that was reached.
pub fn execute(args: DlSingleArgs, output: &OutputConfig) -> Result<()> {
    let provider = args.remote.provider()?;
    let build_config = args.branches.build_config()?;
    let yaml_file = resolve(&args.yaml_file, "YAML file")?;
    let output_dir = resolve(&args.output_dir, "output directory")?;

    let descriptor = loader::load_single(&yaml_file)
        .with_context(|| format!("Failed to load migration from {}", yaml_file.display()))?;
    require_git()?;

    let vcs = GitCli;
    let builder = SnapshotRepoBuilder::new(&provider, &vcs, &build_config);
    match builder.build(&descriptor, &output_dir)? {
        BuildOutcome::Published(path) => println!(
            "{} {} -> {}",
            emoji(output, "✅", "[OK]"),
            descriptor,
            path.display()
        ),
        BuildOutcome::AlreadyPresent(path) => println!(
            "{} {} already present at {}",
            emoji(output, "⏭️", "[EXISTS]"),
            descriptor,
            path.display()
        ),
    }
    Ok(())
}
