//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use eduvulcan_core::Feed;

/// eduvulcan - EduVulcan lessons, homework and exams as calendars
#[derive(Debug, Parser)]
#[command(name = "eduvulcan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "EDUVULCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the token file (overrides `token_path`)
    #[arg(long, env = "EDUVULCAN_TOKEN")]
    pub token: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check the token file without contacting the server
    Validate,

    /// Run one sync pass and print the result as JSON
    Sync {
        /// Do not write the calendar files
        #[arg(long)]
        dry_run: bool,

        /// Only print this feed (lessons, homework or exams)
        #[arg(long)]
        feed: Option<Feed>,
    },

    /// Keep the calendars up to date in the foreground
    Run,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration
    Dump,

    /// Show configuration file path
    Path,
}
