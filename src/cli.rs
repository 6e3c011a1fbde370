// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `planrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "planrun",
    version,
    about = "Run named task plans: sequenced and parallel build/copy/serve/test steps.",
    long_about = None
)]
pub struct CliArgs {
    /// Name of the task to run.
    #[arg(required_unless_present = "dry_run")]
    pub task: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Planrun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Planrun.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PLANRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task table, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
