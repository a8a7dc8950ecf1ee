//! `loadwise config`: print the effective configuration.

use clap::Args;
use loadwise::OrchestratorConfig;

use crate::error::CliError;

/// Arguments for the config command.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Print JSON instead of INI
    #[arg(long)]
    pub json: bool,
}

/// Print the configuration that commands run with.
pub fn run(args: ConfigArgs, config: &OrchestratorConfig) -> Result<(), CliError> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", config.to_ini_string());
    }
    Ok(())
}
