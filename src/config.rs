//! # Build Configuration
//!
//! Immutable configuration values threaded explicitly through the builder
//! and the coordinator. Nothing here is process-wide state: a caller builds a
//! `BuildConfig` once (usually from CLI flags) and passes a reference down.
//!
//! - **`Identity`**: the synthetic author/committer of generated commits.
//! - **`BuildConfig`**: branch names and commit messages of one build.
//! - **`CoordinatorConfig`**: worker count, pacing delay and descriptor cap
//!   of a batch run.

use std::time::Duration;

use crate::defaults;
use crate::error::{Error, Result};
use crate::git::is_valid_branch_name;

/// Author and committer recorded on generated commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: defaults::GIT_USER_NAME.to_string(),
            email: defaults::GIT_USER_EMAIL.to_string(),
        }
    }
}

/// Settings for building one snapshot repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Branch that receives the migration commit snapshot.
    pub gt_branch: String,
    /// Initial branch name; `None` keeps whatever `git init` picks.
    pub base_branch: Option<String>,
    /// Identity used for both commits.
    pub identity: Identity,
    /// Message of the pre-migration commit.
    pub base_message: String,
    /// Message of the ground-truth commit.
    pub gt_message: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            gt_branch: defaults::GT_BRANCH_NAME.to_string(),
            base_branch: None,
            identity: Identity::default(),
            base_message: defaults::BASE_COMMIT_MESSAGE.to_string(),
            gt_message: defaults::GT_COMMIT_MESSAGE.to_string(),
        }
    }
}

impl BuildConfig {
    /// Default configuration with a custom ground-truth branch.
    pub fn with_gt_branch(gt_branch: &str) -> Self {
        Self {
            gt_branch: gt_branch.to_string(),
            ..Self::default()
        }
    }

    /// Set the initial branch name.
    pub fn base_branch(mut self, base_branch: Option<&str>) -> Self {
        self.base_branch = base_branch.map(str::to_string);
        self
    }

    /// Reject branch names git would refuse, and a ground-truth branch that
    /// collides with the base branch.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_branch_name(&self.gt_branch) {
            return Err(Error::InvalidBranchName {
                name: self.gt_branch.clone(),
            });
        }
        if let Some(base) = &self.base_branch {
            if !is_valid_branch_name(base) {
                return Err(Error::InvalidBranchName { name: base.clone() });
            }
            if *base == self.gt_branch {
                return Err(Error::BranchExists { name: base.clone() });
            }
        }
        Ok(())
    }
}

/// Settings for a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Size of the worker pool.
    pub workers: usize,
    /// Delay slept before every remote call.
    pub rate_limit_delay: Duration,
    /// Process at most this many descriptors.
    pub max_count: Option<usize>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            workers: defaults::MAX_WORKERS,
            rate_limit_delay: Duration::from_secs_f64(defaults::RATE_LIMIT_SECS),
            max_count: None,
        }
    }
}

impl CoordinatorConfig {
    /// Build from CLI-style values; a worker count of zero becomes one,
    /// negative or NaN delays become zero and delays too large for a
    /// `Duration` saturate at `Duration::MAX`.
    pub fn new(workers: usize, rate_limit_secs: f64, max_count: Option<usize>) -> Self {
        let rate_limit_delay = if rate_limit_secs > 0.0 {
            Duration::try_from_secs_f64(rate_limit_secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self {
            workers: workers.max(1),
            rate_limit_delay,
            max_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.gt_branch, "gt-patch");
        assert_eq!(config.base_branch, None);
        assert_eq!(config.identity.name, "PyMigBench Downloader");
        assert_eq!(config.identity.email, "downloader@pymigbench_dl.local");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_config_rejects_invalid_branch() {
        let config = BuildConfig::with_gt_branch("bad name");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidBranchName { .. })
        ));

        let config = BuildConfig::default().base_branch(Some("a..b"));
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidBranchName { .. })
        ));
    }

    #[test]
    fn test_build_config_rejects_branch_collision() {
        let config = BuildConfig::with_gt_branch("main").base_branch(Some("main"));
        assert!(matches!(config.validate(), Err(Error::BranchExists { .. })));
    }

    #[test]
    fn test_coordinator_config_clamps() {
        let config = CoordinatorConfig::new(0, -1.0, Some(3));
        assert_eq!(config.workers, 1);
        assert_eq!(config.rate_limit_delay, Duration::ZERO);
        assert_eq!(config.max_count, Some(3));

        let config = CoordinatorConfig::new(8, f64::NAN, None);
        assert_eq!(config.rate_limit_delay, Duration::ZERO);

        let config = CoordinatorConfig::new(2, 0.5, None);
        assert_eq!(config.rate_limit_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_coordinator_config_saturates_huge_delays() {
        for secs in [1e30, f64::MAX, f64::INFINITY] {
            let config = CoordinatorConfig::new(1, secs, None);
            assert_eq!(config.rate_limit_delay, Duration::MAX, "{secs}");
        }
        let config = CoordinatorConfig::new(1, f64::NEG_INFINITY, None);
        assert_eq!(config.rate_limit_delay, Duration::ZERO);
    }

    #[test]
    fn test_coordinator_config_default() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.workers, 5);
        assert_eq!(config.rate_limit_delay, Duration::from_secs(1));
    }
}
