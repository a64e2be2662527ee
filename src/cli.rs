// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `buildctx`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildctx",
    version,
    about = "Track build contexts and detect changed content for a utility CSS compiler.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `buildctx.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "buildctx.toml")]
    pub config: PathBuf,

    /// Source file whose directive markers decide whether the build opts
    /// into content tracking. Without it, tracking is assumed.
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,

    /// Stay running and react to filesystem events.
    #[arg(long, conflicts_with = "once")]
    pub watch: bool,

    /// Run one poll-based scan and exit, no watching.
    #[arg(long)]
    pub once: bool,

    /// Treat this as a production build (infers build mode when neither
    /// --watch nor --once is given).
    #[arg(long)]
    pub production: bool,

    /// Disable the touch-file rebuild-trigger mechanism.
    #[arg(long)]
    pub no_touch: bool,

    /// Override the touch-file directory location.
    #[arg(long, value_name = "DIR")]
    pub touch_dir: Option<PathBuf>,

    /// Report glob roots as file dependencies instead of directory
    /// dependencies.
    #[arg(long)]
    pub file_deps: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDCTX_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
