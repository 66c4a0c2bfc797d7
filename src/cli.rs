// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `hbuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hbuild",
    version,
    about = "Incremental build tool for C++ sources with generated C#/JavaScript code.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "hbuild.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HBUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate schema code, then build the given targets (default: all).
    Build {
        /// `glob`, `client`, `server`, `logic/<name>`, `server-exe`, `client-exe`.
        targets: Vec<String>,
    },
    /// Remove objects and link artifacts of the given targets.
    Clean { targets: Vec<String> },
    /// Regenerate code from schema files.
    Generate {
        /// Regenerate even when outputs are newer than their schema.
        #[arg(long)]
        force: bool,
    },
    /// Run the `[[install]]` rules.
    Install,
    /// Run the `[[deploy]]` rules.
    Deploy,
    /// Clean, then build.
    Rebuild { targets: Vec<String> },
    /// List stale sources and pending links without building.
    Status { targets: Vec<String> },
    /// Build, then rebuild whenever sources change.
    Watch {
        targets: Vec<String>,

        /// Quiet period after a change before rebuilding.
        #[arg(long, value_name = "MS", default_value_t = 300)]
        debounce_ms: u64,
    },
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
