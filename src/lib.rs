//! # migbench-dl
//!
//! Reconstructs minimal, reproducible git repositories from a benchmark of
//! library-migration commits (PyMigBench-style YAML records). For every
//! migration the library fetches two snapshots from the code host and lays
//! them down as two commits in a fresh repository:
//!
//! - the **base branch** holds the parent of the migration commit,
//! - the **ground-truth branch** (`gt-patch` by default) holds the migration
//!   commit itself.
//!
//! The original history is not preserved. A repository is published under its
//! final name only after both commits exist, so output folders are always
//! complete.
//!
//! ## Quick Example
//!
//! ```
//! use migbench_dl::loader;
//! use std::path::Path;
//!
//! let yaml = "repo: acme/widgets\ncommit: cafef00d\n";
//! let descriptors = loader::parse(yaml, Path::new("inline.yaml")).unwrap();
//! assert_eq!(descriptors[0].folder_name(), "acme_widgets__cafef00d");
//! ```
//!
//! ## Core Concepts
//!
//! - **Loading (`loader`, `model`)**: parse descriptor files into
//!   [`model::MigrationDescriptor`] values.
//! - **Providers (`provider`, `github`)**: resolve the parent of a commit and
//!   fetch tree tarballs, paced to respect rate limits.
//! - **Materializing (`archive`)**: unpack a tarball with its wrapper
//!   directory removed.
//! - **Version control (`vcs`, `git`)**: a narrow init/add/commit/branch
//!   interface over the system `git`, with an in-memory double.
//! - **Building (`builder`)**: stage, commit twice, publish atomically.
//! - **Coordinating (`coordinator`)**: run many builds on a worker pool and
//!   summarize the outcomes.

pub mod archive;
pub mod builder;
pub mod config;
pub mod coordinator;
pub mod defaults;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod github;
pub mod loader;
pub mod model;
pub mod output;
pub mod path;
pub mod provider;
pub mod vcs;

#[cfg(test)]
mod path_proptest;
