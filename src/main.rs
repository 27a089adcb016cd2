//! # migbench-dl CLI
//!
//! Binary entry point for the `migbench-dl` command-line tool. It parses the
//! arguments with `clap` and dispatches to the matching command; all download
//! logic lives in the library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
