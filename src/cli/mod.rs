//! CLI argument parsing for accessquest
//!
//! Global flags: --config, --database, --format, --quiet, --verbose, --log-level, --log-json

pub mod args;
pub mod parse;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use args::{AutoDownloadArgs, DownloadArgs, FilterCommands, QuestsCommands};
pub use accessquest_core::format::OutputFormat;
use parse::parse_format;

/// AccessQuest - accessibility survey quests for OpenStreetMap
#[derive(Parser, Debug)]
#[command(name = "accessquest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to <config dir>/accessquest/config.toml)
    #[arg(long, global = true, env = "ACCESSQUEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Quest database, overriding the configured one
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_parser = parse_format, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level or filter directive (e.g. `debug`, `accessquest_core=trace`)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and evaluate element filter expressions
    Filter {
        #[command(subcommand)]
        command: FilterCommands,
    },

    /// List the registered quest types
    QuestTypes,

    /// Download map data for an area and create quests
    Download(DownloadArgs),

    /// Show the area an automatic download around a position would fetch
    AutoDownload(AutoDownloadArgs),

    /// Inspect and answer stored quests
    Quests {
        #[command(subcommand)]
        command: QuestsCommands,
    },
}
