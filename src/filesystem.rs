//! In-memory file trees
//!
//! `MemoryFS` holds a snapshot of a working tree as `path -> File`. It backs
//! the in-memory version-control double and is used to compare a committed
//! tree with the tree extracted from an archive.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Represents a file with content and its mode bits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// File permissions (simplified as u32)
    pub permissions: u32,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            permissions: 0o644, // Default permissions
        }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    /// Mark the file executable
    pub fn executable(mut self) -> Self {
        self.permissions = 0o755;
        self
    }

    /// Whether any execute bit is set
    pub fn is_executable(&self) -> bool {
        self.permissions & 0o111 != 0
    }
}

/// Differences between two trees, keyed by relative path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDiff {
    /// Present only in the right-hand tree
    pub added: Vec<PathBuf>,
    /// Present only in the left-hand tree
    pub removed: Vec<PathBuf>,
    /// Present in both with different content or executable bit
    pub changed: Vec<PathBuf>,
}

impl TreeDiff {
    /// True when both trees are identical
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// In-memory filesystem snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFS {
    /// Files stored as path -> content mapping
    files: BTreeMap<PathBuf, File>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a file
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, file: File) -> Result<()> {
        let path = path.as_ref();
        if path.is_absolute() || path.as_os_str().is_empty() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("expected a relative file path, got '{}'", path.display()),
            )));
        }
        self.files.insert(path.to_path_buf(), file);
        Ok(())
    }

    /// Add a file with string content
    pub fn add_file_string<P: AsRef<Path>>(&mut self, path: P, content: &str) -> Result<()> {
        self.add_file(path, File::from_string(content))
    }

    /// Get a file by path
    pub fn get_file<P: AsRef<Path>>(&self, path: P) -> Option<&File> {
        self.files.get(path.as_ref())
    }

    /// Remove a file
    pub fn remove_file<P: AsRef<Path>>(&mut self, path: P) -> Option<File> {
        self.files.remove(path.as_ref())
    }

    /// Check if a file exists
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.contains_key(path.as_ref())
    }

    /// List all files in path order
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate files in path order
    pub fn files(&self) -> impl Iterator<Item = (&PathBuf, &File)> {
        self.files.iter()
    }

    /// Snapshot a directory from disk, skipping the top-level `.git`
    /// directory. Symlinks are recorded with their target as content.
    pub fn load_dir(root: &Path) -> Result<Self> {
        fn load_directory(dir: &Path, base_path: &Path, fs: &mut MemoryFS) -> Result<()> {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                let relative_path = path
                    .strip_prefix(base_path)
                    .map_err(|e| Error::Io(std::io::Error::other(e)))?
                    .to_path_buf();
                let file_type = entry.file_type()?;

                if file_type.is_symlink() {
                    let target = fs::read_link(&path)?;
                    let file = File::new(target.to_string_lossy().into_owned().into_bytes());
                    fs.add_file(relative_path, file)?;
                } else if file_type.is_dir() {
                    if dir == base_path && entry.file_name() == ".git" {
                        continue;
                    }
                    load_directory(&path, base_path, fs)?;
                } else {
                    let content = fs::read(&path)?;
                    let file = File {
                        content,
                        permissions: mode_of(&entry.metadata()?),
                    };
                    fs.add_file(relative_path, file)?;
                }
            }
            Ok(())
        }

        let mut fs = MemoryFS::new();
        load_directory(root, root, &mut fs)?;
        Ok(fs)
    }

    /// Write every file below `root`, creating parent directories.
    pub fn write_to(&self, root: &Path) -> Result<()> {
        for (relative_path, file) in &self.files {
            let full_path = root.join(relative_path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&full_path, &file.content)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&full_path, fs::Permissions::from_mode(file.permissions))?;
            }
        }
        Ok(())
    }

    /// Compare against `other`. Only content and the executable bit count,
    /// which is what git records.
    pub fn diff(&self, other: &MemoryFS) -> TreeDiff {
        let left: BTreeSet<&PathBuf> = self.files.keys().collect();
        let right: BTreeSet<&PathBuf> = other.files.keys().collect();

        let mut diff = TreeDiff {
            added: right.difference(&left).map(|p| (*p).clone()).collect(),
            removed: left.difference(&right).map(|p| (*p).clone()).collect(),
            changed: Vec::new(),
        };
        for path in left.intersection(&right) {
            let (a, b) = (&self.files[*path], &other.files[*path]);
            if a.content != b.content || a.is_executable() != b.is_executable() {
                diff.changed.push((*path).clone());
            }
        }
        diff
    }
}

/// Remove everything in `dir` except the `.git` directory, so the next
/// snapshot replaces the tree instead of overlaying it. Symlinks are removed
/// themselves, never followed.
pub(crate) fn clear_worktree(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn mode_of(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn mode_of(_metadata: &fs::Metadata) -> u32 {
    0o644
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_and_get() {
        let mut fs = MemoryFS::new();
        fs.add_file_string("src/main.rs", "fn main() {}").unwrap();
        assert!(fs.exists("src/main.rs"));
        assert_eq!(fs.len(), 1);
        assert_eq!(
            fs.get_file("src/main.rs").unwrap().content,
            b"fn main() {}".to_vec()
        );
        assert!(fs.remove_file("src/main.rs").is_some());
        assert!(fs.is_empty());
    }

    #[test]
    fn test_rejects_absolute_paths() {
        let mut fs = MemoryFS::new();
        assert!(fs.add_file_string("/etc/passwd", "x").is_err());
        assert!(fs.add_file_string("", "x").is_err());
    }

    #[test]
    fn test_write_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut fs = MemoryFS::new();
        fs.add_file_string("README.md", "# Widgets").unwrap();
        fs.add_file_string("src/lib.rs", "pub fn f() {}").unwrap();
        fs.add_file("bin/run.sh", File::from_string("#!/bin/sh\n").executable())
            .unwrap();

        fs.write_to(temp.path()).unwrap();
        let loaded = MemoryFS::load_dir(temp.path()).unwrap();

        assert!(fs.diff(&loaded).is_empty(), "{:?}", fs.diff(&loaded));
        assert!(loaded.get_file("bin/run.sh").unwrap().is_executable());
    }

    #[test]
    fn test_load_skips_top_level_git_only() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".git/objects")).unwrap();
        std::fs::write(temp.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::create_dir_all(temp.path().join("vendor/.git")).unwrap();
        std::fs::write(temp.path().join("vendor/.git/HEAD"), "x").unwrap();
        std::fs::write(temp.path().join("file.txt"), "content").unwrap();

        let loaded = MemoryFS::load_dir(temp.path()).unwrap();
        assert_eq!(
            loaded.list_files(),
            vec![PathBuf::from("file.txt"), PathBuf::from("vendor/.git/HEAD")]
        );
    }

    #[test]
    fn test_diff_reports_each_kind() {
        let mut left = MemoryFS::new();
        left.add_file_string("kept.txt", "same").unwrap();
        left.add_file_string("gone.txt", "old").unwrap();
        left.add_file_string("edited.txt", "v1").unwrap();
        left.add_file_string("mode.sh", "echo").unwrap();

        let mut right = MemoryFS::new();
        right.add_file_string("kept.txt", "same").unwrap();
        right.add_file_string("new.txt", "fresh").unwrap();
        right.add_file_string("edited.txt", "v2").unwrap();
        right
            .add_file("mode.sh", File::from_string("echo").executable())
            .unwrap();

        let diff = left.diff(&right);
        assert_eq!(diff.added, vec![PathBuf::from("new.txt")]);
        assert_eq!(diff.removed, vec![PathBuf::from("gone.txt")]);
        assert_eq!(
            diff.changed,
            vec![PathBuf::from("edited.txt"), PathBuf::from("mode.sh")]
        );
        assert!(!diff.is_empty());
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_clear_worktree_keeps_git_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".git/refs")).unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/lib.rs"), "x").unwrap();
        fs::write(temp.path().join(".gitignore"), "*.log").unwrap();

        clear_worktree(temp.path()).unwrap();
        assert_eq!(names(temp.path()), vec![".git"]);
        assert!(temp.path().join(".git/refs").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_clear_worktree_does_not_follow_symlinks() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("keep.txt"), "mine").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).unwrap();

        clear_worktree(temp.path()).unwrap();
        assert!(names(temp.path()).is_empty());
        assert!(outside.path().join("keep.txt").exists());
    }
}
