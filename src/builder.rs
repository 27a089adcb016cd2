//! # Snapshot Repository Builder
//!
//! Turns one [`MigrationDescriptor`] into a two-commit repository:
//!
//! 1. the parent of the migration commit is committed on the base branch,
//! 2. the migration commit itself is committed on the ground-truth branch,
//! 3. the base branch is checked out again.
//!
//! Everything happens in a staging directory next to the final location
//! (`<output>/.tmp__<owner>_<name>__<sha>XXXXXX`). The staging directory is
//! renamed to `<output>/<owner>_<name>__<sha>` only once both commits exist,
//! so a partially built repository is never visible under its final name.
//! Any failure removes the staging directory and reports the last stage the
//! build reached.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::archive;
use crate::config::BuildConfig;
use crate::defaults;
use crate::error::{Error, Result};
use crate::filesystem::clear_worktree;
use crate::model::MigrationDescriptor;
use crate::provider::SnapshotProvider;
use crate::vcs::VersionControl;

/// Progress of a single build. A failed build reports the last stage it
/// reached; its staging directory is always removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStage {
    Pending,
    ParentResolved,
    BaseCommitted,
    GtCommitted,
    Published,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::Pending => "pending",
            BuildStage::ParentResolved => "parent-resolved",
            BuildStage::BaseCommitted => "base-committed",
            BuildStage::GtCommitted => "gt-committed",
            BuildStage::Published => "published",
        };
        f.write_str(name)
    }
}

/// Successful result of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The repository was built and published at this path.
    Published(PathBuf),
    /// A repository already existed at this path; nothing was fetched.
    AlreadyPresent(PathBuf),
}

impl BuildOutcome {
    pub fn path(&self) -> &Path {
        match self {
            BuildOutcome::Published(path) | BuildOutcome::AlreadyPresent(path) => path,
        }
    }
}

/// Builds snapshot repositories from a provider into an output directory.
pub struct SnapshotRepoBuilder<'a> {
    provider: &'a dyn SnapshotProvider,
    vcs: &'a dyn VersionControl,
    config: &'a BuildConfig,
}

impl<'a> SnapshotRepoBuilder<'a> {
    pub fn new(
        provider: &'a dyn SnapshotProvider,
        vcs: &'a dyn VersionControl,
        config: &'a BuildConfig,
    ) -> Self {
        Self {
            provider,
            vcs,
            config,
        }
    }

    /// Build the repository for `descriptor` under `output_dir`.
    ///
    /// Returns [`BuildOutcome::AlreadyPresent`] without any remote call when
    /// the target folder exists. Failures are wrapped in [`Error::Build`].
    pub fn build(&self, descriptor: &MigrationDescriptor, output_dir: &Path) -> Result<BuildOutcome> {
        let final_dir = descriptor.target_dir(output_dir);
        if final_dir.exists() {
            info!("Skipping {}: {} already exists", descriptor, final_dir.display());
            return Ok(BuildOutcome::AlreadyPresent(final_dir));
        }

        let mut stage = BuildStage::Pending;
        let wrap = |stage: BuildStage, source: Error| Error::Build {
            descriptor: descriptor.to_string(),
            stage,
            source: Box::new(source),
        };

        let parent = self
            .provider
            .resolve_parent(&descriptor.repo, &descriptor.commit)
            .map_err(|e| wrap(stage, e))?;
        stage = BuildStage::ParentResolved;
        debug!("{}: parent is {}", descriptor, parent);

        fs::create_dir_all(output_dir).map_err(|e| wrap(stage, e.into()))?;
        let staging = tempfile::Builder::new()
            .prefix(&format!(
                "{}{}__{}",
                defaults::STAGING_PREFIX,
                descriptor.repo_safe(),
                descriptor.commit
            ))
            .tempdir_in(output_dir)
            .map_err(|e| wrap(stage, e.into()))?;
        debug!("{}: staging in {}", descriptor, staging.path().display());

        if let Err(e) = self.populate(descriptor, &parent, staging.path(), &mut stage) {
            let staging_path = staging.path().to_path_buf();
            if let Err(cleanup) = staging.close() {
                warn!(
                    "Could not remove staging directory {}: {}",
                    staging_path.display(),
                    cleanup
                );
            }
            debug!("{}: failed after {}, staging cleaned", descriptor, stage);
            return Err(wrap(stage, e));
        }

        let staging_path = staging.keep();
        match fs::rename(&staging_path, &final_dir) {
            Ok(()) => {
                info!("Published {} to {}", descriptor, final_dir.display());
                Ok(BuildOutcome::Published(final_dir))
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&staging_path) {
                    warn!(
                        "Could not remove staging directory {}: {}",
                        staging_path.display(),
                        cleanup
                    );
                }
                if final_dir.exists() {
                    info!(
                        "{} was published concurrently at {}",
                        descriptor,
                        final_dir.display()
                    );
                    Ok(BuildOutcome::AlreadyPresent(final_dir))
                } else {
                    Err(wrap(stage, e.into()))
                }
            }
        }
    }

    /// Steps 4 to 6: both commits plus the final checkout, all inside
    /// `staging`. Advances `stage` as each step completes.
    fn populate(
        &self,
        descriptor: &MigrationDescriptor,
        parent: &str,
        staging: &Path,
        stage: &mut BuildStage,
    ) -> Result<()> {
        let config = self.config;
        let repo = descriptor.repo.as_str();

        let base_archive = self.provider.fetch_archive(repo, parent)?;
        archive::extract_top(&base_archive, staging)?;
        drop(base_archive);
        self.vcs.init(staging, config.base_branch.as_deref())?;
        self.vcs.add_all(staging)?;
        self.vcs
            .commit(staging, &config.base_message, &config.identity)?;
        let base_branch = self.vcs.current_branch(staging)?;
        *stage = BuildStage::BaseCommitted;
        debug!("{}: base commit on '{}'", descriptor, base_branch);

        self.vcs.create_branch(staging, &config.gt_branch)?;
        clear_worktree(staging)?;
        let gt_archive = self.provider.fetch_archive(repo, &descriptor.commit)?;
        archive::extract_top(&gt_archive, staging)?;
        drop(gt_archive);
        self.vcs.add_all(staging)?;
        self.vcs.commit(staging, &config.gt_message, &config.identity)?;
        *stage = BuildStage::GtCommitted;
        debug!("{}: ground truth commit on '{}'", descriptor, config.gt_branch);

        self.vcs.checkout(staging, &base_branch)?;
        Ok(())
    }
}
