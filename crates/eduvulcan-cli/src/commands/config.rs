//! Configuration commands.

use crate::config::AppConfig;
use crate::error::{CliError, CliResult};

/// Dump the effective configuration to stdout.
pub fn dump(config: &AppConfig) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| CliError::Output(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", AppConfig::default_path().display());
    println!("# token: {}", config.token_path().display());
    println!("# output: {}", config.output_dir().display());
    println!("{}", toml_str);
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> CliResult<()> {
    println!("config: {}", AppConfig::default_path().display());
    Ok(())
}
