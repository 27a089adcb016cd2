//! Path expansion utilities for user-supplied locations

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{Error, Result};

fn env_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .expect("env var pattern is valid")
    })
}

/// Expand `$VAR` and `${VAR}` references from the process environment.
///
/// Unset variables are left untouched, matching shell `expandvars` behavior.
pub fn expand_env_vars(input: &str) -> String {
    env_var_regex()
        .replace_all(input, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Expand a leading `~` or `~/` to the home directory.
pub fn expand_home(input: &str) -> PathBuf {
    if input == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}

/// Turn a possibly relative, variable-containing path into an absolute one.
///
/// `$HOME/projects`, `~/projects` and `./projects` all resolve against the
/// environment and the current directory. The path does not need to exist.
pub fn resolve_path(input: &Path) -> Result<PathBuf> {
    let raw = input.to_string_lossy();
    let expanded = expand_home(&expand_env_vars(&raw));
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        let cwd = env::current_dir().map_err(Error::Io)?;
        Ok(cwd.join(expanded))
    }
}
