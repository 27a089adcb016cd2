//! # Download Coordinator
//!
//! Runs one build task per migration descriptor on a fixed-size worker pool
//! and folds the per-task outcomes into a [`Summary`].
//!
//! ## Behavior
//!
//! - Tasks are independent: a failing task is recorded and never aborts its
//!   siblings.
//! - Every remote call of every worker is preceded by a fixed pacing sleep
//!   (see [`PacedProvider`]).
//! - Reports come back in descriptor order regardless of completion order.
//! - A progress line is logged every [`PROGRESS_LOG_INTERVAL`] completed
//!   tasks, and an optional callback sees each report as it completes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, info, warn};
use rayon::prelude::*;

use crate::builder::{BuildOutcome, SnapshotRepoBuilder};
use crate::config::{BuildConfig, CoordinatorConfig};
use crate::error::{Error, Result};
use crate::loader;
use crate::model::MigrationDescriptor;
use crate::provider::{PacedProvider, SnapshotProvider};
use crate::vcs::VersionControl;

/// Completed tasks between two progress log lines.
pub const PROGRESS_LOG_INTERVAL: usize = 10;

/// Final state of one build task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Published,
    AlreadyPresent,
    /// The descriptor cannot be built (root or merge commit).
    Skipped(String),
    Failed(String),
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Published => write!(f, "published"),
            TaskStatus::AlreadyPresent => write!(f, "already present"),
            TaskStatus::Skipped(reason) => write!(f, "skipped: {}", reason),
            TaskStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Outcome of one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub descriptor: MigrationDescriptor,
    /// Final output location, whether or not it was created.
    pub target: PathBuf,
    pub status: TaskStatus,
}

impl TaskReport {
    fn from_result(
        descriptor: &MigrationDescriptor,
        target: PathBuf,
        result: Result<BuildOutcome>,
    ) -> Self {
        let status = match result {
            Ok(BuildOutcome::Published(_)) => TaskStatus::Published,
            Ok(BuildOutcome::AlreadyPresent(_)) => TaskStatus::AlreadyPresent,
            Err(e) if e.is_skip() => TaskStatus::Skipped(e.root().to_string()),
            Err(e) => TaskStatus::Failed(e.to_string()),
        };
        Self {
            descriptor: descriptor.clone(),
            target,
            status,
        }
    }
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub published: usize,
    pub already_present: usize,
    pub skipped: usize,
    pub failed: usize,
    /// One report per descriptor, in input order.
    pub reports: Vec<TaskReport>,
}

impl Summary {
    fn from_reports(reports: Vec<TaskReport>) -> Self {
        let mut summary = Summary::default();
        for report in &reports {
            match report.status {
                TaskStatus::Published => summary.published += 1,
                TaskStatus::AlreadyPresent => summary.already_present += 1,
                TaskStatus::Skipped(_) => summary.skipped += 1,
                TaskStatus::Failed(_) => summary.failed += 1,
            }
        }
        summary.reports = reports;
        summary
    }

    pub fn total(&self) -> usize {
        self.published + self.already_present + self.skipped + self.failed
    }

    /// True when no task failed. Skips do not count as failures.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, TaskStatus::Failed(_)))
    }
}

/// Callback invoked after each completed task. Called from worker threads.
pub type ProgressFn<'a> = dyn Fn(&TaskReport) + Sync + 'a;

/// Drives builds for many descriptors concurrently.
pub struct Coordinator<'a> {
    provider: &'a dyn SnapshotProvider,
    vcs: &'a dyn VersionControl,
    build_config: &'a BuildConfig,
    config: &'a CoordinatorConfig,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        provider: &'a dyn SnapshotProvider,
        vcs: &'a dyn VersionControl,
        build_config: &'a BuildConfig,
        config: &'a CoordinatorConfig,
    ) -> Self {
        Self {
            provider,
            vcs,
            build_config,
            config,
        }
    }

    /// Load every descriptor under `yaml_root` and build them all.
    pub fn run_path(
        &self,
        yaml_root: &Path,
        output_dir: &Path,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<Summary> {
        let descriptors = loader::load(yaml_root)?;
        self.run(&descriptors, output_dir, progress)
    }

    /// Build `descriptors` (capped at `max_count`) into `output_dir`.
    pub fn run(
        &self,
        descriptors: &[MigrationDescriptor],
        output_dir: &Path,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<Summary> {
        let limit = self
            .config
            .max_count
            .map_or(descriptors.len(), |max| max.min(descriptors.len()));
        let tasks = &descriptors[..limit];
        if limit < descriptors.len() {
            info!(
                "Processing {} of {} descriptors (max count)",
                limit,
                descriptors.len()
            );
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers.max(1))
            .thread_name(|i| format!("migbench-dl-worker-{}", i))
            .build()
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        let paced = PacedProvider::new(self.provider, self.config.rate_limit_delay);
        let builder = SnapshotRepoBuilder::new(&paced, self.vcs, self.build_config);
        let completed = AtomicUsize::new(0);
        let total = tasks.len();

        info!(
            "Building {} repositories with {} workers",
            total, self.config.workers
        );

        let reports: Vec<TaskReport> = pool.install(|| {
            tasks
                .par_iter()
                .map(|descriptor| {
                    let target = descriptor.target_dir(output_dir);
                    let result = builder.build(descriptor, output_dir);
                    let report = TaskReport::from_result(descriptor, target, result);
                    match &report.status {
                        TaskStatus::Skipped(reason) => warn!("Skipped {}: {}", descriptor, reason),
                        TaskStatus::Failed(reason) => error!("Failed {}: {}", descriptor, reason),
                        _ => {}
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if done % PROGRESS_LOG_INTERVAL == 0 {
                        info!("Progress: {}/{} tasks completed", done, total);
                    }
                    if let Some(callback) = progress {
                        callback(&report);
                    }
                    report
                })
                .collect()
        });

        let summary = Summary::from_reports(reports);
        info!(
            "Done: {} published, {} already present, {} skipped, {} failed",
            summary.published, summary.already_present, summary.skipped, summary.failed
        );
        Ok(summary)
    }
}
