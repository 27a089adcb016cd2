//! # Version Control Capability
//!
//! The snapshot builder needs only a handful of version-control actions:
//! initialize, stage everything, commit, create a branch, switch branches.
//! This module defines that narrow interface as the [`VersionControl`] trait
//! and provides two implementations:
//!
//! - **`GitCli`**: the production implementation, delegating to the system
//!   `git` command through [`crate::git`].
//! - **`MemoryVcs`**: an in-memory double that records each commit as a
//!   [`MemoryFS`] tree per branch. It reads and writes the real working
//!   directory, so builder behavior (deletions, checkouts) stays observable
//!   on disk without a git toolchain. Individual operations can be made to
//!   fail to exercise cleanup paths.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::Identity;
use crate::error::{Error, Result};
use crate::filesystem::{clear_worktree, MemoryFS};
use crate::git;

/// Version-control actions used by the snapshot builder.
pub trait VersionControl: Send + Sync {
    /// Create an empty repository in `dir`.
    fn init(&self, dir: &Path, initial_branch: Option<&str>) -> Result<()>;

    /// Stage every change in the working tree, deletions included.
    fn add_all(&self, dir: &Path) -> Result<()>;

    /// Commit the staged tree on the current branch.
    fn commit(&self, dir: &Path, message: &str, identity: &Identity) -> Result<()>;

    /// Name of the checked-out branch.
    fn current_branch(&self, dir: &Path) -> Result<String>;

    /// Create `branch` at the current commit and check it out. Fails with
    /// [`Error::BranchExists`] when the branch is already there.
    fn create_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Check out an existing branch.
    fn checkout(&self, dir: &Path, branch: &str) -> Result<()>;
}

/// `VersionControl` backed by the system `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl VersionControl for GitCli {
    fn init(&self, dir: &Path, initial_branch: Option<&str>) -> Result<()> {
        git::init(dir, initial_branch)
    }

    fn add_all(&self, dir: &Path) -> Result<()> {
        git::add_all(dir)
    }

    fn commit(&self, dir: &Path, message: &str, identity: &Identity) -> Result<()> {
        git::commit(dir, message, identity)
    }

    fn current_branch(&self, dir: &Path) -> Result<String> {
        git::current_branch(dir)
    }

    fn create_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        if !git::is_valid_branch_name(branch) {
            return Err(Error::InvalidBranchName {
                name: branch.to_string(),
            });
        }
        if git::branch_exists(dir, branch)? {
            return Err(Error::BranchExists {
                name: branch.to_string(),
            });
        }
        git::create_branch_and_checkout(dir, branch)
    }

    fn checkout(&self, dir: &Path, branch: &str) -> Result<()> {
        git::checkout(dir, branch)
    }
}

/// Operations of [`MemoryVcs`] that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsOp {
    Init,
    AddAll,
    Commit,
    CreateBranch,
    Checkout,
}

/// A commit recorded by [`MemoryVcs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCommit {
    pub message: String,
    pub author: Identity,
    pub tree: MemoryFS,
}

/// Repository state recorded by [`MemoryVcs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryRepo {
    /// Checked-out branch.
    pub head: String,
    /// Commit history per branch, oldest first.
    pub branches: BTreeMap<String, Vec<MemoryCommit>>,
    index: Option<MemoryFS>,
}

impl MemoryRepo {
    /// Latest commit of `branch`.
    pub fn tip(&self, branch: &str) -> Option<&MemoryCommit> {
        self.branches.get(branch).and_then(|history| history.last())
    }

    /// Number of commits reachable from `branch`.
    pub fn commit_count(&self, branch: &str) -> usize {
        self.branches.get(branch).map_or(0, Vec::len)
    }
}

/// In-memory `VersionControl` double, keyed by working directory.
#[derive(Debug, Default)]
pub struct MemoryVcs {
    repos: Mutex<HashMap<PathBuf, MemoryRepo>>,
    fail_on: Option<VcsOp>,
    default_branch: String,
}

const MEMORY_DEFAULT_BRANCH: &str = "main";

impl MemoryVcs {
    pub fn new() -> Self {
        Self {
            default_branch: MEMORY_DEFAULT_BRANCH.to_string(),
            ..Self::default()
        }
    }

    /// A double whose every call of `op` fails.
    pub fn failing_on(op: VcsOp) -> Self {
        Self {
            fail_on: Some(op),
            ..Self::new()
        }
    }

    /// Snapshot of the repository initialized in `dir`, if any.
    pub fn repo(&self, dir: &Path) -> Result<Option<MemoryRepo>> {
        Ok(self.lock()?.get(dir).cloned())
    }

    /// Snapshot of every repository, in path order.
    pub fn repos(&self) -> Result<Vec<(PathBuf, MemoryRepo)>> {
        let mut all: Vec<_> = self
            .lock()?
            .iter()
            .map(|(path, repo)| (path.clone(), repo.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(all)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<PathBuf, MemoryRepo>>> {
        self.repos.lock().map_err(|_| Error::LockPoisoned {
            context: "memory vcs repositories".to_string(),
        })
    }

    fn check(&self, op: VcsOp, dir: &Path) -> Result<()> {
        if self.fail_on == Some(op) {
            return Err(Error::GitCommand {
                command: format!("{:?}", op),
                dir: dir.display().to_string(),
                stderr: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn with_repo<T>(&self, dir: &Path, f: impl FnOnce(&mut MemoryRepo) -> Result<T>) -> Result<T> {
        let mut repos = self.lock()?;
        let repo = repos.get_mut(dir).ok_or_else(|| Error::GitCommand {
            command: "rev-parse".to_string(),
            dir: dir.display().to_string(),
            stderr: "not a repository".to_string(),
        })?;
        f(repo)
    }
}

impl VersionControl for MemoryVcs {
    fn init(&self, dir: &Path, initial_branch: Option<&str>) -> Result<()> {
        self.check(VcsOp::Init, dir)?;
        fs::create_dir_all(dir.join(".git"))?;
        let head = initial_branch.unwrap_or(&self.default_branch).to_string();
        self.lock()?.insert(
            dir.to_path_buf(),
            MemoryRepo {
                head,
                ..MemoryRepo::default()
            },
        );
        Ok(())
    }

    fn add_all(&self, dir: &Path) -> Result<()> {
        self.check(VcsOp::AddAll, dir)?;
        let tree = MemoryFS::load_dir(dir)?;
        self.with_repo(dir, |repo| {
            repo.index = Some(tree);
            Ok(())
        })
    }

    fn commit(&self, dir: &Path, message: &str, identity: &Identity) -> Result<()> {
        self.check(VcsOp::Commit, dir)?;
        self.with_repo(dir, |repo| {
            let tree = match &repo.index {
                Some(index) => index.clone(),
                None => repo
                    .tip(&repo.head)
                    .map(|c| c.tree.clone())
                    .unwrap_or_default(),
            };
            let head = repo.head.clone();
            repo.branches.entry(head).or_default().push(MemoryCommit {
                message: message.to_string(),
                author: identity.clone(),
                tree,
            });
            Ok(())
        })
    }

    fn current_branch(&self, dir: &Path) -> Result<String> {
        self.with_repo(dir, |repo| Ok(repo.head.clone()))
    }

    fn create_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        self.check(VcsOp::CreateBranch, dir)?;
        if !git::is_valid_branch_name(branch) {
            return Err(Error::InvalidBranchName {
                name: branch.to_string(),
            });
        }
        self.with_repo(dir, |repo| {
            if repo.branches.contains_key(branch) || repo.head == branch {
                return Err(Error::BranchExists {
                    name: branch.to_string(),
                });
            }
            let history = repo.branches.get(&repo.head).cloned().unwrap_or_default();
            repo.branches.insert(branch.to_string(), history);
            repo.head = branch.to_string();
            Ok(())
        })
    }

    fn checkout(&self, dir: &Path, branch: &str) -> Result<()> {
        self.check(VcsOp::Checkout, dir)?;
        let tree = self.with_repo(dir, |repo| {
            let tree = repo
                .tip(branch)
                .map(|c| c.tree.clone())
                .ok_or_else(|| Error::GitCommand {
                    command: format!("checkout {}", branch),
                    dir: dir.display().to_string(),
                    stderr: format!("pathspec '{}' did not match any branch", branch),
                })?;
            repo.head = branch.to_string();
            repo.index = Some(tree.clone());
            Ok(tree)
        })?;
        clear_worktree(dir)?;
        tree.write_to(dir)
    }
}
