//! CLI argument parsing and command dispatch

use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;
use migbench_dl::output::OutputConfig;

/// Download PyMigBench migrations as minimal two-commit git repositories
#[derive(Parser, Debug)]
#[command(name = "migbench-dl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download every migration found under a directory of YAML files
    DlAll(commands::dl_all::DlAllArgs),

    /// Download the migration described by a single YAML file
    DlSingle(commands::dl_single::DlSingleArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

/// Raise `base` by `steps` levels, saturating at `trace`.
fn raise_level(base: LevelFilter, steps: u8) -> LevelFilter {
    let mut level = base;
    for _ in 0..steps {
        level = match level {
            LevelFilter::Off => LevelFilter::Error,
            LevelFilter::Error => LevelFilter::Warn,
            LevelFilter::Warn => LevelFilter::Info,
            LevelFilter::Info => LevelFilter::Debug,
            LevelFilter::Debug | LevelFilter::Trace => LevelFilter::Trace,
        };
    }
    level
}

impl Cli {
    fn init_logging(&self, output: &OutputConfig) {
        let base = LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info);
        let level = raise_level(base, self.verbose);

        let mut builder = env_logger::Builder::new();
        builder.filter_level(level);
        // RUST_LOG wins over the flags when set
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        builder.write_style(if output.use_color {
            env_logger::WriteStyle::Always
        } else {
            env_logger::WriteStyle::Never
        });
        // a second init (e.g. in tests) is harmless
        let _ = builder.try_init();
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let output = OutputConfig::from_env_and_flag(&self.color);
        self.init_logging(&output);

        match self.command {
            Commands::DlAll(args) => commands::dl_all::execute(args, &output),
            Commands::DlSingle(args) => commands::dl_single::execute(args, &output),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
