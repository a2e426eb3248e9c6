//! Token validation command.

use crate::config::AppConfig;
use crate::error::CliResult;

use super::load_credential;

/// Validates the token file and prints what it grants.
pub fn run(config: &AppConfig) -> CliResult<()> {
    let path = config.token_path();
    let credential = load_credential(&path)?;

    println!("token:   {}", path.display());
    println!("tenant:  {}", credential.tenant());
    if let Some(name) = credential.name() {
        println!("pupil:   {}", name);
    }
    if let Some(uid) = credential.uid() {
        println!("account: {}", uid);
    }
    let caps: Vec<&str> = credential.capabilities().iter().map(String::as_str).collect();
    println!("caps:    {}", caps.join(", "));
    println!("Token is valid.");
    Ok(())
}
