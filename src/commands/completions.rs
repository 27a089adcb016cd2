//! # completions Command Implementation
//!
//! Prints a tab-completion script for `migbench-dl` covering both download
//! commands and every flag, including the `GITHUB_TOKEN`-backed ones. The
//! script goes to stdout unless `--output` names a file.
//!
//! ```bash
//! migbench-dl completions bash > ~/.local/share/bash-completion/completions/migbench-dl
//! migbench-dl completions zsh --output ~/.zfunc/_migbench-dl
//! ```

use anyhow::{Context, Result};
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use super::resolve;
use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to this file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Completion script for `shell`, named after the binary.
pub fn render(shell: Shell) -> Vec<u8> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut script = Vec::new();
    generate(shell, &mut cmd, name, &mut script);
    script
}

/// Execute the `completions` command.
///
/// # Behavior
///
/// Renders the script for the chosen shell. With `--output`, the path is
/// expanded like every other path flag (`~`, `$VAR`), parent directories are
/// created and the file is overwritten. Otherwise the script is written to
/// stdout.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    let script = render(args.shell);
    match args.output {
        Some(path) => {
            let path = resolve(&path, "completions output")?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&path, &script)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => io::stdout()
            .write_all(&script)
            .context("Failed to write completions to stdout")?,
    }
    Ok(())
}
