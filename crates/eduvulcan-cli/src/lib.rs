//! eduvulcan binary: config, token file, calendar output, daemon
//!
//! This crate provides the `eduvulcan` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod sink;

pub use cli::Cli;
pub use config::AppConfig;
pub use error::{CliError, CliResult};
pub use sink::{JsonDirSink, LogSink};
