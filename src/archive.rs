//! # Archive Materializer
//!
//! Snapshot tarballs served by code hosts wrap the whole tree in a single
//! synthetic top directory (`<owner>-<name>-<sha>/`). [`extract_top`] unpacks
//! such an archive into a target directory with that wrapper removed, so the
//! target directory becomes the repository root.
//!
//! Archives may be gzip-compressed or plain tar; the format is detected from
//! the leading magic bytes.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;
use tar::{Archive, EntryType};

use crate::error::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn malformed(message: impl Into<String>) -> Error {
    Error::MalformedArchive {
        message: message.into(),
    }
}

/// Split an entry path into its wrapper component and the remainder.
///
/// Rejects absolute paths and `..` components anywhere in the entry.
fn split_wrapper(path: &Path) -> Result<(String, PathBuf)> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => components.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(malformed(format!(
                    "entry '{}' escapes the archive root",
                    path.display()
                )))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(malformed(format!(
                    "entry '{}' is an absolute path",
                    path.display()
                )))
            }
        }
    }

    let Some((wrapper, rest)) = components.split_first() else {
        return Err(malformed("entry with an empty path"));
    };
    let relative: PathBuf = rest.iter().collect();
    Ok((wrapper.to_string_lossy().into_owned(), relative))
}

/// Reject `relative` when it passes through, or lands on, a path already
/// present under `target_dir` as a symlink. Earlier entries may have created
/// links pointing anywhere; writing through one would leave `target_dir`.
fn reject_symlinked_path(target_dir: &Path, relative: &Path) -> Result<()> {
    let mut current = target_dir.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                return Err(malformed(format!(
                    "entry '{}' would be written through a symlink",
                    relative.display()
                )))
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Unpack `archive_bytes` into `target_dir`, removing the single leading
/// wrapper directory from every entry.
///
/// Fails with [`Error::MalformedArchive`] when entries disagree on the
/// wrapper, when a regular file sits at the top level, or when an entry
/// path tries to leave the archive root, lexically or through a symlink
/// extracted earlier. On error `target_dir` may hold a
/// partial tree; callers extract into a directory they discard on failure.
pub fn extract_top(archive_bytes: &[u8], target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;

    let reader: Box<dyn Read + '_> = if archive_bytes.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(Cursor::new(archive_bytes)))
    } else {
        Box::new(Cursor::new(archive_bytes))
    };
    let mut archive = Archive::new(reader);

    let mut wrapper: Option<String> = None;
    let mut unpacked = 0usize;

    let entries = archive
        .entries()
        .map_err(|e| malformed(format!("cannot read tar stream: {}", e)))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| malformed(format!("corrupt tar entry: {}", e)))?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions()
            || entry_type.is_pax_local_extensions()
            || entry_type.is_gnu_longname()
            || entry_type.is_gnu_longlink()
        {
            continue;
        }
        if !(entry_type.is_file() || entry_type.is_dir() || entry_type.is_symlink()) {
            return Err(malformed(format!(
                "unsupported entry type {:?}",
                entry_type
            )));
        }

        let path = entry
            .path()
            .map_err(|e| malformed(format!("unreadable entry path: {}", e)))?
            .into_owned();
        let (top, relative) = split_wrapper(&path)?;

        match &wrapper {
            None => wrapper = Some(top.clone()),
            Some(expected) if *expected != top => {
                return Err(malformed(format!(
                    "entry '{}' is outside the wrapper directory '{}'",
                    path.display(),
                    expected
                )))
            }
            Some(_) => {}
        }

        if relative.as_os_str().is_empty() {
            if entry_type.is_dir() {
                continue;
            }
            return Err(malformed(format!(
                "entry '{}' is not inside a wrapper directory",
                path.display()
            )));
        }

        reject_symlinked_path(target_dir, &relative)?;
        let destination = target_dir.join(&relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&destination)?;
        unpacked += 1;
    }

    if wrapper.is_none() {
        return Err(malformed("archive has no entries"));
    }

    debug!(
        "Extracted {} entries into {}",
        unpacked,
        target_dir.display()
    );
    Ok(())
}
