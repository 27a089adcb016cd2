//! # Snapshot Providers
//!
//! A snapshot provider answers two questions about a remote repository: what
//! are the parents of a commit, and what does the full tree at a commit look
//! like (as a tarball). The builder only talks to the [`SnapshotProvider`]
//! trait, so tests swap the GitHub client for an in-process fake.
//!
//! [`PacedProvider`] wraps any provider and sleeps a fixed delay before each
//! remote call, which keeps a pool of workers under the host's request quota.

use std::thread;
use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};
use crate::model::CommitInfo;

/// Source of commit metadata and tree snapshots.
pub trait SnapshotProvider: Send + Sync {
    /// Metadata for `commit` in `repo`, including its ordered parents.
    fn commit_info(&self, repo: &str, commit: &str) -> Result<CommitInfo>;

    /// Tarball of the complete tree at `commit`.
    fn fetch_archive(&self, repo: &str, commit: &str) -> Result<Vec<u8>>;

    /// The single parent of `commit`.
    ///
    /// Root commits and merge commits fail with [`Error::AmbiguousHistory`].
    fn resolve_parent(&self, repo: &str, commit: &str) -> Result<String> {
        let info = self.commit_info(repo, commit)?;
        match info.parents.as_slice() {
            [parent] => Ok(parent.clone()),
            parents => Err(Error::AmbiguousHistory {
                repo: repo.to_string(),
                commit: commit.to_string(),
                parents: parents.len(),
            }),
        }
    }
}

impl<P: SnapshotProvider + ?Sized> SnapshotProvider for &P {
    fn commit_info(&self, repo: &str, commit: &str) -> Result<CommitInfo> {
        (**self).commit_info(repo, commit)
    }

    fn fetch_archive(&self, repo: &str, commit: &str) -> Result<Vec<u8>> {
        (**self).fetch_archive(repo, commit)
    }
}

/// Provider wrapper that sleeps before every remote call.
#[derive(Debug, Clone)]
pub struct PacedProvider<P> {
    inner: P,
    delay: Duration,
}

impl<P: SnapshotProvider> PacedProvider<P> {
    pub fn new(inner: P, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn pace(&self) {
        if !self.delay.is_zero() {
            debug!("Pacing remote call for {:?}", self.delay);
            thread::sleep(self.delay);
        }
    }
}

impl<P: SnapshotProvider> SnapshotProvider for PacedProvider<P> {
    fn commit_info(&self, repo: &str, commit: &str) -> Result<CommitInfo> {
        self.pace();
        self.inner.commit_info(repo, commit)
    }

    fn fetch_archive(&self, repo: &str, commit: &str) -> Result<Vec<u8>> {
        self.pace();
        self.inner.fetch_archive(repo, commit)
    }
}
