//! Show-config CLI command.

use anyhow::Result;
use clap::Args;

use super::{load_config, to_json};

/// Arguments for the show-config command.
#[derive(Args, Debug, Clone)]
pub struct ShowConfigArgs {
    /// Config file path (defaults to config/Optimizer.toml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Config profile layered over the base file
    #[arg(long, env = "RISK_ALLOC_PROFILE")]
    pub profile: Option<String>,
}

/// Prints the effective configuration with the credential redacted.
///
/// # Errors
/// Returns an error if the configuration cannot be parsed.
pub fn run_show_config(args: ShowConfigArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.profile.as_deref())?;
    println!("{}", to_json(&config.redacted(), true)?);
    Ok(())
}
