// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `flatwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "flatwatch",
    version,
    about = "Watch directories non-recursively, sharing one OS watch per path and filter set.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Flatwatch.toml` in the current working directory. The file
    /// is reloaded whenever it changes.
    #[arg(long, value_name = "PATH", default_value = "Flatwatch.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FLATWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Emit per-watcher trace messages (overrides `[watcher].verbose`).
    #[arg(long)]
    pub verbose: bool,

    /// Parse + validate, print the merged watch requests, but don't watch.
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
