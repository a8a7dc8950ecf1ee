//! `loadwise estimate`: estimate how long a payload takes to load.

use clap::Args;
use console::style;
use loadwise::{LoadClass, OrchestratorConfig, PerformanceSampler};
use serde_json::json;

use super::common::HostArgs;
use super::strategy::print_snapshot;
use crate::error::CliError;

/// Arguments for the estimate command.
#[derive(Debug, Args)]
pub struct EstimateArgs {
    /// Payload size in bytes
    #[arg(value_name = "BYTES")]
    pub size: u64,

    /// Payload class (api, image, component)
    #[arg(long, default_value = "api")]
    pub class: LoadClass,

    #[command(flatten)]
    pub host: HostArgs,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the estimate command.
pub fn run(args: EstimateArgs, config: &OrchestratorConfig) -> Result<(), CliError> {
    let sampler = PerformanceSampler::new(args.host.probe(), config.snapshot_ttl());
    let snapshot = sampler.sample();
    let estimate = snapshot.estimate_load_time(args.size, args.class);

    if args.json {
        let output = json!({
            "size_bytes": args.size,
            "class": args.class,
            "estimate_ms": estimate.as_millis() as u64,
            "snapshot": snapshot,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_snapshot(Some(&snapshot));
    println!(
        "{} {} bytes ({:?}): {}",
        style("Estimate:").bold(),
        args.size,
        args.class,
        style(format!("{}ms", estimate.as_millis())).green()
    );
    Ok(())
}
