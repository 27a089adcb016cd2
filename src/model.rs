//! Migration descriptors and commit metadata

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One benchmark migration: a repository and the commit that completed the
/// migration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MigrationDescriptor {
    /// Repository in `owner/name` form.
    pub repo: String,
    /// Migration commit id (full or abbreviated hex sha).
    pub commit: String,
}

impl MigrationDescriptor {
    pub fn new(repo: &str, commit: &str) -> Self {
        Self {
            repo: repo.to_string(),
            commit: commit.to_string(),
        }
    }

    /// Repository name safe for use in filesystem paths.
    pub fn repo_safe(&self) -> String {
        self.repo.replace('/', "_")
    }

    /// Output folder name, unique per migration commit:
    /// `<owner>_<name>__<commit>`.
    pub fn folder_name(&self) -> String {
        format!("{}__{}", self.repo_safe(), self.commit)
    }

    /// Final output path of this descriptor under `output_dir`.
    pub fn target_dir(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.folder_name())
    }

    /// Check the record shape; returns a message and a hint on failure.
    pub fn validate(&self) -> Result<(), (String, String)> {
        if !is_valid_repo(&self.repo) {
            return Err((
                format!("invalid repository identifier '{}'", self.repo),
                "use the form owner/name, e.g. 'acme/widgets'".to_string(),
            ));
        }
        if !is_valid_commit(&self.commit) {
            return Err((
                format!("invalid commit id '{}'", self.commit),
                "expected 4 to 40 hexadecimal characters".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for MigrationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repo, self.commit)
    }
}

/// Commit metadata returned by a snapshot provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub repo: String,
    pub commit: String,
    /// Parent commit ids in the order the host reports them.
    pub parents: Vec<String>,
}

fn repo_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._-]+/[A-Za-z0-9._-]+$").expect("repository pattern is valid")
    })
}

fn commit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{4,40}$").expect("commit pattern is valid"))
}

/// Whether `repo` looks like `owner/name`.
pub fn is_valid_repo(repo: &str) -> bool {
    repo_regex().is_match(repo) && !repo.split('/').any(|part| part == "." || part == "..")
}

/// Whether `commit` looks like a (possibly abbreviated) hex sha.
pub fn is_valid_commit(commit: &str) -> bool {
    commit_regex().is_match(commit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_name() {
        let descriptor = MigrationDescriptor::new("acme/widgets", "deadbeef");
        assert_eq!(descriptor.repo_safe(), "acme_widgets");
        assert_eq!(descriptor.folder_name(), "acme_widgets__deadbeef");
        assert_eq!(
            descriptor.target_dir(Path::new("/out")),
            PathBuf::from("/out/acme_widgets__deadbeef")
        );
    }

    #[test]
    fn test_display() {
        let descriptor = MigrationDescriptor::new("acme/widgets", "deadbeef");
        assert_eq!(descriptor.to_string(), "acme/widgets@deadbeef");
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let full = "0123456789abcdef0123456789abcdef01234567";
        assert!(MigrationDescriptor::new("acme/widgets", full)
            .validate()
            .is_ok());
        assert!(MigrationDescriptor::new("my-org/my.repo_2", "cafe")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_repo() {
        for repo in ["widgets", "a/b/c", "/widgets", "acme/", "acme/..", "ac me/w"] {
            let err = MigrationDescriptor::new(repo, "deadbeef")
                .validate()
                .unwrap_err();
            assert!(err.0.contains("repository"), "{repo}: {err:?}");
        }
    }

    #[test]
    fn test_validate_rejects_bad_commit() {
        for commit in ["", "abc", "xyz12345", "0123456789abcdef0123456789abcdef012345678"] {
            let err = MigrationDescriptor::new("acme/widgets", commit)
                .validate()
                .unwrap_err();
            assert!(err.0.contains("commit"), "{commit}: {err:?}");
        }
    }
}
