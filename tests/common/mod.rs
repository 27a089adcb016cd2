//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_file("mig.yaml", MIGRATION_YAML);
//!     fixture.command().arg("dl-single").assert().failure();
//! }
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_fs::prelude::*;

use migbench_dl::error::{Error, Result};
use migbench_dl::model::CommitInfo;
use migbench_dl::provider::SnapshotProvider;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git_available, FakeProvider, Snapshot, TestFixture, MIGRATION_YAML};
}

/// Descriptor file for the `acme/widgets` example migration.
#[allow(dead_code)]
pub const MIGRATION_YAML: &str = r#"
id: widgets-requests-httpx
source: requests
target: httpx
repo: acme/widgets
commit: deadbeef
pr: https://github.com/acme/widgets/pull/7
"#;

/// Whether git-backed tests can run on this machine.
#[allow(dead_code)]
pub fn git_available() -> bool {
    migbench_dl::git::is_available()
}

/// A tree snapshot served as a GitHub-style tarball.
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    files: Vec<(String, Vec<u8>, u32)>,
}

#[allow(dead_code)]
impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files
            .push((path.to_string(), content.as_bytes().to_vec(), 0o644));
        self
    }

    pub fn executable(mut self, path: &str, content: &str) -> Self {
        self.files
            .push((path.to_string(), content.as_bytes().to_vec(), 0o755));
        self
    }

    /// Gzip tarball with every entry under `wrapper/`.
    pub fn tarball(&self, wrapper: &str) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, content, mode) in &self.files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(*mode);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder
                .append_data(
                    &mut header,
                    format!("{}/{}", wrapper, path),
                    content.as_slice(),
                )
                .unwrap();
        }
        let tar = builder.into_inner().unwrap();
        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(&tar).unwrap();
        gz.finish().unwrap()
    }
}

/// In-process snapshot provider with a fixed commit graph.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeProvider {
    parents: HashMap<String, Vec<String>>,
    snapshots: HashMap<String, Snapshot>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `commit` with its parents and tree.
    pub fn commit(mut self, commit: &str, parents: &[&str], snapshot: Snapshot) -> Self {
        self.parents.insert(
            commit.to_string(),
            parents.iter().map(|p| p.to_string()).collect(),
        );
        self.snapshots.insert(commit.to_string(), snapshot);
        self
    }

    /// Number of remote calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn not_found(repo: &str, commit: &str) -> Error {
        Error::NotFound {
            repo: repo.to_string(),
            commit: commit.to_string(),
        }
    }
}

impl SnapshotProvider for FakeProvider {
    fn commit_info(&self, repo: &str, commit: &str) -> Result<CommitInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let parents = self
            .parents
            .get(commit)
            .ok_or_else(|| Self::not_found(repo, commit))?;
        Ok(CommitInfo {
            repo: repo.to_string(),
            commit: commit.to_string(),
            parents: parents.clone(),
        })
    }

    fn fetch_archive(&self, repo: &str, commit: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let snapshot = self
            .snapshots
            .get(commit)
            .ok_or_else(|| Self::not_found(repo, commit))?;
        Ok(snapshot.tarball(&format!("{}-{}", repo.replace('/', "-"), commit)))
    }
}

/// A temporary working directory for CLI tests.
#[allow(dead_code)]
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Create an (empty) directory.
    pub fn with_dir(self, path: &str) -> Self {
        self.temp_dir
            .child(path)
            .create_dir_all()
            .expect("Failed to create directory");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A `migbench-dl` command running in this fixture's directory, with
    /// the ambient token and API URL removed.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("migbench-dl");
        cmd.current_dir(self.path())
            .env_remove("GITHUB_TOKEN")
            .env_remove("MIGBENCH_DL_API_URL")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
