//! # Migration Descriptor Loader
//!
//! Reads PyMigBench-style YAML records into [`MigrationDescriptor`] values.
//! A record needs a `repo` and a `commit` key; every other key of the
//! benchmark format (`id`, `source`, `target`, `pr`, `tags`, ...) is ignored.
//!
//! Two layouts are supported:
//!
//! - a single file holding one record (or a YAML sequence of records), and
//! - a directory tree, walked recursively for `*.yaml` / `*.yml` files in
//!   sorted order. Records that map to the same output folder are collapsed,
//!   first occurrence wins.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Deserializer};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::model::MigrationDescriptor;

#[derive(Debug, Deserialize)]
struct MigrationRecord {
    #[serde(deserialize_with = "scalar_string")]
    repo: String,
    #[serde(deserialize_with = "scalar_string")]
    commit: String,
}

/// Accept any YAML scalar as a string. An all-digit abbreviated sha is
/// otherwise read as an integer.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    use serde_yaml::Value;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string, found {}",
            describe(&other)
        ))),
    }
}

fn describe(value: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn parse_error(path: &Path, message: impl Into<String>, hint: Option<&str>) -> Error {
    Error::DescriptorParse {
        path: path.display().to_string(),
        message: message.into(),
        hint: hint.map(str::to_string),
    }
}

fn into_descriptor(path: &Path, record: MigrationRecord) -> Result<MigrationDescriptor> {
    let descriptor = MigrationDescriptor {
        repo: record.repo,
        commit: record.commit,
    };
    descriptor
        .validate()
        .map_err(|(message, hint)| parse_error(path, message, Some(&hint)))?;
    Ok(descriptor)
}

/// Parse YAML content holding one record or a sequence of records.
///
/// `origin` is only used for error messages.
pub fn parse(content: &str, origin: &Path) -> Result<Vec<MigrationDescriptor>> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| parse_error(origin, e.to_string(), None))?;

    let records: Vec<MigrationRecord> = match value {
        serde_yaml::Value::Sequence(_) => serde_yaml::from_value::<Vec<MigrationRecord>>(value),
        serde_yaml::Value::Mapping(_) => {
            serde_yaml::from_value::<MigrationRecord>(value).map(|r| vec![r])
        }
        other => {
            return Err(parse_error(
                origin,
                format!("expected a mapping, found {}", describe(&other)),
                Some("a record looks like:\n    repo: owner/name\n    commit: <sha>"),
            ))
        }
    }
    .map_err(|e| {
        parse_error(
            origin,
            e.to_string(),
            Some("each record needs 'repo' and 'commit' keys"),
        )
    })?;

    records
        .into_iter()
        .map(|record| into_descriptor(origin, record))
        .collect()
}

/// Load every record of a single YAML file.
pub fn load_file(path: &Path) -> Result<Vec<MigrationDescriptor>> {
    let content = fs::read_to_string(path)
        .map_err(|e| parse_error(path, format!("cannot read file: {}", e), None))?;
    parse(&content, path)
}

/// Load a file that must hold exactly one record.
pub fn load_single(path: &Path) -> Result<MigrationDescriptor> {
    let mut descriptors = load_file(path)?;
    match descriptors.len() {
        1 => Ok(descriptors.remove(0)),
        n => Err(parse_error(
            path,
            format!("expected exactly one record, found {}", n),
            Some("use dl-all with a directory for multiple records"),
        )),
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Load all records below `root`, walking subdirectories.
pub fn load_dir(root: &Path) -> Result<Vec<MigrationDescriptor>> {
    if !root.is_dir() {
        return Err(parse_error(
            root,
            "descriptor directory not found",
            Some("pass the directory holding the benchmark YAML files"),
        ));
    }

    let mut seen = HashSet::new();
    let mut descriptors = Vec::new();
    let mut files = 0usize;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            Error::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other(message)),
            )
        })?;
        if !entry.file_type().is_file() || !is_yaml(entry.path()) {
            continue;
        }
        files += 1;
        for descriptor in load_file(entry.path())? {
            if seen.insert(descriptor.folder_name()) {
                descriptors.push(descriptor);
            } else {
                debug!(
                    "Duplicate record {} in {}, keeping the first",
                    descriptor,
                    entry.path().display()
                );
            }
        }
    }

    info!(
        "Loaded {} migration(s) from {} file(s) under {}",
        descriptors.len(),
        files,
        root.display()
    );
    Ok(descriptors)
}

/// Load from a file or a directory, whichever `path` is.
pub fn load(path: &Path) -> Result<Vec<MigrationDescriptor>> {
    if path.is_dir() {
        load_dir(path)
    } else {
        load_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PYMIGBENCH_RECORD: &str = r#"
id: requests__aiohttp__acme/widgets__deadbeef
source: requests
target: aiohttp
repo: acme/widgets
commit: deadbeef
pr_url: https://github.com/acme/widgets/pull/1
commit_message: move to aiohttp
tags: []
"#;

    #[test]
    fn test_parse_pymigbench_record() {
        let descriptors = parse(PYMIGBENCH_RECORD, Path::new("mig.yaml")).unwrap();
        assert_eq!(
            descriptors,
            vec![MigrationDescriptor::new("acme/widgets", "deadbeef")]
        );
    }

    #[test]
    fn test_parse_sequence() {
        let yaml = r#"
- repo: acme/widgets
  commit: deadbeef
- repo: acme/gadgets
  commit: cafef00d
"#;
        let descriptors = parse(yaml, Path::new("all.yaml")).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[1].repo, "acme/gadgets");
    }

    #[test]
    fn test_parse_numeric_commit() {
        let yaml = "repo: acme/widgets\ncommit: 12345678\n";
        let descriptors = parse(yaml, Path::new("mig.yaml")).unwrap();
        assert_eq!(descriptors[0].commit, "12345678");
    }

    #[test]
    fn test_parse_missing_commit() {
        let err = parse("repo: acme/widgets\n", Path::new("mig.yaml")).unwrap_err();
        let display = err.to_string();
        assert!(display.contains("mig.yaml"));
        assert!(display.contains("commit"));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn test_parse_invalid_repo_has_hint() {
        let err = parse("repo: widgets\ncommit: deadbeef\n", Path::new("m.yaml")).unwrap_err();
        assert!(err.to_string().contains("owner/name"));
    }

    #[test]
    fn test_parse_scalar_document() {
        let err = parse("just a string", Path::new("m.yaml")).unwrap_err();
        assert!(err.to_string().contains("expected a mapping"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        assert!(parse("repo: [unclosed", Path::new("m.yaml")).is_err());
    }

    #[test]
    fn test_load_single_rejects_multiple() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("two.yaml");
        fs::write(
            &path,
            "- {repo: a/b, commit: deadbeef}\n- {repo: c/d, commit: cafef00d}\n",
        )
        .unwrap();
        let err = load_single(&path).unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_load_single_missing_file() {
        let err = load_single(Path::new("/nonexistent/mig.yaml")).unwrap_err();
        assert!(err.to_string().contains("cannot read file"));
    }

    #[test]
    fn test_load_dir_recursive_sorted_and_deduplicated() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("migration").join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            temp.path().join("migration").join("b.yaml"),
            "repo: acme/b\ncommit: bbbbbbbb\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("migration").join("a.yml"),
            "repo: acme/a\ncommit: aaaaaaaa\n",
        )
        .unwrap();
        fs::write(nested.join("c.yaml"), "repo: acme/c\ncommit: cccccccc\n").unwrap();
        // same commit as b.yaml under another migration id
        fs::write(nested.join("dup.yaml"), "repo: acme/b\ncommit: bbbbbbbb\n").unwrap();
        fs::write(temp.path().join("README.md"), "not yaml").unwrap();

        let descriptors = load_dir(temp.path()).unwrap();
        let repos: Vec<_> = descriptors.iter().map(|d| d.repo.as_str()).collect();
        assert_eq!(repos, vec!["acme/a", "acme/b", "acme/c"]);
    }

    #[test]
    fn test_load_dir_missing() {
        let err = load_dir(Path::new("/nonexistent/yamls")).unwrap_err();
        assert!(err.to_string().contains("directory not found"));
    }

    #[test]
    fn test_load_dispatches_on_kind() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("mig.yaml");
        fs::write(&file, PYMIGBENCH_RECORD).unwrap();
        assert_eq!(load(&file).unwrap().len(), 1);
        assert_eq!(load(temp.path()).unwrap().len(), 1);
    }
}
