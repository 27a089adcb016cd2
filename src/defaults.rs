//! Default values for migbench-dl configuration.
//!
//! This module provides centralized default values used across the library
//! and the CLI, ensuring that the literals which end up inside generated
//! repositories (branch name, identity, commit messages) stay stable across
//! runs.

use std::time::Duration;

/// Name of the branch holding the post-migration snapshot.
pub const GT_BRANCH_NAME: &str = "gt-patch";

/// Synthetic author/committer name used for both generated commits.
pub const GIT_USER_NAME: &str = "PyMigBench Downloader";

/// Synthetic author/committer email used for both generated commits.
pub const GIT_USER_EMAIL: &str = "downloader@pymigbench_dl.local";

/// Commit message of the pre-migration (parent) commit.
pub const BASE_COMMIT_MESSAGE: &str = "Repo initialized using parent commit of the migration commit (git history of original repo is removed)";

/// Commit message of the ground-truth migration commit.
pub const GT_COMMIT_MESSAGE: &str = "Repo updated with ground truth migration commit";

/// Number of concurrent builds in batch mode.
pub const MAX_WORKERS: usize = 5;

/// Seconds slept before each remote call, per worker.
pub const RATE_LIMIT_SECS: f64 = 1.0;

/// Base URL of the GitHub REST API.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Request timeout for remote calls. Tarballs of large repositories take a
/// while.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Prefix of staging directories created inside the output directory.
pub const STAGING_PREFIX: &str = ".tmp__";

/// User agent sent with every request.
pub fn user_agent() -> String {
    format!("migbench-dl/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version() {
        let agent = user_agent();
        assert!(agent.starts_with("migbench-dl/"));
        assert!(agent.ends_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_commit_messages_are_distinct() {
        assert_ne!(BASE_COMMIT_MESSAGE, GT_COMMIT_MESSAGE);
    }
}
