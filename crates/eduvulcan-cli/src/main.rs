//! eduvulcan CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use eduvulcan_cli::cli::{Cli, Command, ConfigAction};
use eduvulcan_cli::commands;
use eduvulcan_cli::config::AppConfig;
use eduvulcan_cli::error::CliResult;
use eduvulcan_core::{LogMode, TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(&e);
        }
    };

    let mode = if cli.debug || config.debug {
        LogMode::Debug
    } else if matches!(cli.command, Command::Run) {
        LogMode::Daemon
    } else {
        LogMode::Command
    };
    if let Err(e) = init_tracing(TracingConfig::new(mode).with_json(cli.json_logs)) {
        eprintln!("warning: failed to initialize logging: {}", e);
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(&e)
        }
    }
}

fn load_config(cli: &Cli) -> CliResult<AppConfig> {
    let mut config = match cli.config {
        Some(ref path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(ref token) = cli.token {
        config.token_path = Some(token.clone());
    }
    Ok(config)
}

async fn run(cli: Cli, config: AppConfig) -> CliResult<()> {
    match cli.command {
        Command::Validate => commands::validate::run(&config),
        Command::Sync { dry_run, feed } => commands::sync::run(&config, dry_run, feed).await,
        Command::Run => commands::daemon::run(&config).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
