//! Thin wrappers around the system `git` command
//!
//! Every invocation runs inside a given working directory and passes a few
//! `-c` overrides so that user configuration cannot alter the recorded
//! content (line-ending conversion) or block a commit (signing, hooks).

use std::path::Path;
use std::process::{Command, Output};

use log::debug;

use crate::config::Identity;
use crate::error::{Error, Result};

/// Config overrides applied to every git invocation.
const CONFIG_OVERRIDES: [&str; 6] = [
    "-c",
    "core.autocrlf=false",
    "-c",
    "core.safecrlf=false",
    "-c",
    "commit.gpgsign=false",
];

/// Variables that would redirect git away from `repo_dir`.
const LOCATION_VARS: [&str; 3] = ["GIT_DIR", "GIT_WORK_TREE", "GIT_INDEX_FILE"];

fn run(repo_dir: &Path, args: &[&str]) -> Result<Output> {
    run_with_env(repo_dir, args, &[])
}

fn run_with_env(repo_dir: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
    debug!("git {} (in {})", args.join(" "), repo_dir.display());
    let mut command = Command::new("git");
    for var in LOCATION_VARS {
        command.env_remove(var);
    }
    command
        .envs(env.iter().copied())
        .args(CONFIG_OVERRIDES)
        .args(args)
        .current_dir(repo_dir)
        .output()
        .map_err(|e| Error::GitCommand {
            command: args.join(" "),
            dir: repo_dir.display().to_string(),
            stderr: e.to_string(),
        })
}

/// Run git and return trimmed stdout, failing on a non-zero exit status.
pub fn run_git(repo_dir: &Path, args: &[&str]) -> Result<String> {
    checked(repo_dir, args, run(repo_dir, args)?)
}

fn checked(repo_dir: &Path, args: &[&str], output: Output) -> Result<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GitCommand {
            command: args.join(" "),
            dir: repo_dir.display().to_string(),
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Initialize a repository, optionally naming the initial branch.
pub fn init(repo_dir: &Path, initial_branch: Option<&str>) -> Result<()> {
    match initial_branch {
        Some(branch) => run_git(repo_dir, &["init", "-q", "--initial-branch", branch])?,
        None => run_git(repo_dir, &["init", "-q"])?,
    };
    Ok(())
}

/// Stage every change in the working tree, including deletions and files
/// matched by the snapshot's own `.gitignore`.
pub fn add_all(repo_dir: &Path) -> Result<()> {
    run_git(repo_dir, &["add", "--all", "--force", "."])?;
    Ok(())
}

/// Commit the index with a fixed identity. Empty commits are allowed so a
/// snapshot identical to its parent still yields a commit.
///
/// The identity is set through both config and the `GIT_AUTHOR_*` /
/// `GIT_COMMITTER_*` variables, since the variables take precedence over
/// config and the caller's environment must not leak into the history.
pub fn commit(repo_dir: &Path, message: &str, identity: &Identity) -> Result<()> {
    let name = format!("user.name={}", identity.name);
    let email = format!("user.email={}", identity.email);
    let args = [
        "-c",
        name.as_str(),
        "-c",
        email.as_str(),
        "commit",
        "-q",
        "--no-verify",
        "--allow-empty",
        "-m",
        message,
    ];
    let env = [
        ("GIT_AUTHOR_NAME", identity.name.as_str()),
        ("GIT_AUTHOR_EMAIL", identity.email.as_str()),
        ("GIT_COMMITTER_NAME", identity.name.as_str()),
        ("GIT_COMMITTER_EMAIL", identity.email.as_str()),
    ];
    checked(repo_dir, &args, run_with_env(repo_dir, &args, &env)?)?;
    Ok(())
}

/// Name of the branch HEAD points at. Works before the first commit.
pub fn current_branch(repo_dir: &Path) -> Result<String> {
    run_git(repo_dir, &["symbolic-ref", "--short", "HEAD"])
}

/// Whether `refs/heads/<branch>` exists.
pub fn branch_exists(repo_dir: &Path, branch: &str) -> Result<bool> {
    let reference = format!("refs/heads/{}", branch);
    let output = run(repo_dir, &["rev-parse", "--verify", "--quiet", &reference])?;
    Ok(output.status.success())
}

/// Create `branch` at HEAD and switch to it.
pub fn create_branch_and_checkout(repo_dir: &Path, branch: &str) -> Result<()> {
    run_git(repo_dir, &["checkout", "-q", "-b", branch])?;
    Ok(())
}

/// Switch to an existing branch.
pub fn checkout(repo_dir: &Path, branch: &str) -> Result<()> {
    run_git(repo_dir, &["checkout", "-q", branch])?;
    Ok(())
}

/// Number of commits reachable from `rev`.
pub fn commit_count(repo_dir: &Path, rev: &str) -> Result<usize> {
    let count = run_git(repo_dir, &["rev-list", "--count", rev])?;
    count.parse().map_err(|_| Error::GitCommand {
        command: format!("rev-list --count {}", rev),
        dir: repo_dir.display().to_string(),
        stderr: format!("unexpected output '{}'", count),
    })
}

/// Subject line of the commit at `rev`.
pub fn commit_subject(repo_dir: &Path, rev: &str) -> Result<String> {
    run_git(repo_dir, &["log", "-1", "--format=%s", rev])
}

/// Whether a usable `git` binary is on the PATH.
pub fn is_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check a branch name against git's ref-name rules
/// (`git check-ref-format --branch`).
pub fn is_valid_branch_name(name: &str) -> bool {
    // `HEAD` is a valid ref component but `--branch` refuses it
    if name.is_empty() || name == "@" || name == "HEAD" || name.starts_with('-') {
        return false;
    }
    if name.starts_with('/') || name.ends_with('/') || name.ends_with('.') {
        return false;
    }
    if name.contains("..") || name.contains("@{") || name.contains("//") {
        return false;
    }
    if name
        .chars()
        .any(|c| c.is_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\'))
    {
        return false;
    }
    name.split('/')
        .all(|part| !part.starts_with('.') && !part.ends_with(".lock"))
}
