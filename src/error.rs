//! # Error Handling
//!
//! This module defines the centralized error type for the `migbench-dl`
//! library. It uses `thiserror` to build a single `Error` enum covering every
//! failure a build can run into, with enough context in each variant to tell
//! which descriptor, URL or directory was involved.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants fall into four groups:
//!   - descriptor loading (`DescriptorParse`),
//!   - remote provider failures (`AmbiguousHistory`, `NotFound`,
//!     `RateLimited`, `Transport`),
//!   - local materialization and version control (`MalformedArchive`,
//!     `GitCommand`, `InvalidBranchName`, `BranchExists`, `Io`),
//!   - build wrapping (`Build`), which records the stage a failed build had
//!     reached.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! No variant is fatal to a batch run; the coordinator uses
//! [`Error::is_skip`] and [`Error::is_retryable`] to classify outcomes.

use thiserror::Error;

use crate::builder::BuildStage;

/// Main error type for migbench-dl operations
#[derive(Error, Debug)]
pub enum Error {
    /// A migration descriptor file could not be parsed or failed validation.
    #[error("Descriptor error in {path}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    DescriptorParse {
        path: String,
        message: String,
        /// Optional hint for how to fix the record
        hint: Option<String>,
    },

    /// The migration commit does not have exactly one parent.
    ///
    /// Root commits and merge commits cannot be split into a single
    /// before/after pair, so the descriptor is skipped.
    #[error("Ambiguous history for {repo}@{commit}: expected exactly 1 parent, found {parents}")]
    AmbiguousHistory {
        repo: String,
        commit: String,
        parents: usize,
    },

    /// The remote host does not know the repository or commit.
    #[error("Not found: {repo}@{commit}")]
    NotFound { repo: String, commit: String },

    /// The remote host is throttling requests.
    #[error("Rate limited by {url}{}", reset.map(|r| format!(" (resets at epoch {})", r)).unwrap_or_default())]
    RateLimited {
        url: String,
        /// Unix timestamp at which the quota resets, when reported
        reset: Option<u64>,
    },

    /// A network, timeout or unexpected-response failure.
    #[error("Transport error: {url} - {message}")]
    Transport { url: String, message: String },

    /// A snapshot archive did not have the expected layout.
    #[error("Malformed archive: {message}")]
    MalformedArchive { message: String },

    /// A `git` invocation failed.
    #[error("Git command failed in {dir}: {command} - {stderr}")]
    GitCommand {
        command: String,
        dir: String,
        stderr: String,
    },

    /// A branch name is not a valid git ref name.
    #[error("Invalid branch name: '{name}'")]
    InvalidBranchName { name: String },

    /// A branch that must be created already exists.
    #[error("Branch already exists: '{name}'")]
    BranchExists { name: String },

    /// A build failed after reaching `stage`; the staging directory has been
    /// removed.
    #[error("Build of {descriptor} failed after {stage}: {source}")]
    Build {
        descriptor: String,
        stage: BuildStage,
        #[source]
        source: Box<Error>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON decoding error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

impl Error {
    /// The innermost error, looking through `Build` wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Build { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this failure means "skip this descriptor" rather than a
    /// build failure. Only unsupported commit shapes qualify.
    pub fn is_skip(&self) -> bool {
        matches!(self.root(), Error::AmbiguousHistory { .. })
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            Error::RateLimited { .. } | Error::Transport { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
