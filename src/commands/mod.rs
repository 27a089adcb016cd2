//! # CLI Command Implementations
//!
//! Each subcommand lives in its own file with an `Args` struct derived with
//! `clap` and an `execute` function that calls into the `migbench_dl`
//! library. Arguments shared by both download commands are defined here and
//! flattened into their `Args`.

pub mod completions;
pub mod dl_all;
pub mod dl_single;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use migbench_dl::config::BuildConfig;
use migbench_dl::defaults;
use migbench_dl::git;
use migbench_dl::github::GitHubProvider;
use migbench_dl::path::resolve_path;

/// Branch naming of generated repositories
#[derive(Args, Debug, Clone)]
pub struct BranchArgs {
    /// Branch that receives the migration commit snapshot
    #[arg(long, value_name = "NAME", default_value = defaults::GT_BRANCH_NAME)]
    pub gt_patch_branch_name: String,

    /// Initial branch name (defaults to git's init.defaultBranch)
    #[arg(long, value_name = "NAME")]
    pub base_branch_name: Option<String>,
}

impl BranchArgs {
    /// Build configuration for these branch names.
    ///
    /// Fails when either name is not a valid git branch name or when both
    /// names are equal, before any repository is touched.
    pub fn build_config(&self) -> Result<BuildConfig> {
        let config = BuildConfig::with_gt_branch(&self.gt_patch_branch_name)
            .base_branch(self.base_branch_name.as_deref());
        config.validate()?;
        Ok(config)
    }
}

/// GitHub access settings
#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// GitHub token used for API requests
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub API base URL (for GitHub Enterprise use https://HOST/api/v3)
    #[arg(
        long,
        value_name = "URL",
        env = "MIGBENCH_DL_API_URL",
        default_value = defaults::GITHUB_API_URL
    )]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = defaults::REQUEST_TIMEOUT.as_secs())]
    pub timeout: u64,
}

impl RemoteArgs {
    /// GitHub provider for these settings.
    ///
    /// # Behavior
    /// - A missing or blank token is an error; `--github-token` wins over
    ///   `GITHUB_TOKEN`.
    /// - `--api-url` must parse as an absolute URL that can serve as a base.
    pub fn provider(&self) -> Result<GitHubProvider> {
        let token = match self.github_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => bail!("GitHub token is required: pass --github-token or set GITHUB_TOKEN"),
        };
        let provider =
            GitHubProvider::new(token, &self.api_url, Duration::from_secs(self.timeout))?;
        Ok(provider)
    }
}

/// Fail early when the `git` binary is missing.
pub fn require_git() -> Result<()> {
    if !git::is_available() {
        bail!("git executable not found on PATH");
    }
    Ok(())
}

/// Resolve a user-supplied path (`~`, `$VAR`, relative).
pub fn resolve(path: &Path, what: &str) -> Result<PathBuf> {
    resolve_path(path).with_context(|| format!("Invalid {} path: {}", what, path.display()))
}
