//! `loadwise strategy`: print the effective strategy for an operation.

use clap::Args;
use console::style;
use loadwise::{
    EffectiveStrategy, OperationType, OrchestratorConfig, PerformanceSampler, PerformanceSnapshot,
    Priority, StrategyCalculator,
};
use serde_json::json;

use super::common::HostArgs;
use crate::error::CliError;

/// Arguments for the strategy command.
#[derive(Debug, Args)]
pub struct StrategyArgs {
    /// Operation type (page, component, data, image, api, widget, background)
    #[arg(value_name = "TYPE", required_unless_present = "all")]
    pub op_type: Option<OperationType>,

    /// Priority (low, medium, high, critical)
    #[arg(short, long, default_value = "medium")]
    pub priority: Priority,

    /// Print every operation type
    #[arg(long)]
    pub all: bool,

    /// Ignore host performance and print the unscaled strategy
    #[arg(long)]
    pub no_adapt: bool,

    #[command(flatten)]
    pub host: HostArgs,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the strategy command.
pub fn run(args: StrategyArgs, config: &OrchestratorConfig) -> Result<(), CliError> {
    let snapshot = (!args.no_adapt && config.performance_aware).then(|| {
        PerformanceSampler::new(args.host.probe(), config.snapshot_ttl()).sample()
    });

    let op_types: Vec<OperationType> = match (args.all, args.op_type) {
        (true, _) => OperationType::ALL.to_vec(),
        (false, Some(op_type)) => vec![op_type],
        (false, None) => {
            return Err(CliError::InvalidArgument(
                "an operation type or --all is required".to_string(),
            ))
        }
    };

    let snap = snapshot.as_ref();
    let rows: Vec<(OperationType, EffectiveStrategy)> = op_types
        .into_iter()
        .map(|op| {
            let strategy = StrategyCalculator::calculate(op, args.priority, snap, None);
            (op, strategy)
        })
        .collect();

    if args.json {
        let strategies: Vec<_> = rows
            .iter()
            .map(|(op, strategy)| {
                json!({ "type": op, "priority": args.priority, "strategy": strategy })
            })
            .collect();
        let output = json!({ "snapshot": snapshot, "strategies": strategies });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_snapshot(snapshot.as_ref());
    println!();
    println!(
        "{:<11} {:>9} {:>9} {:>9} {:>7}  {}",
        style("type").bold(),
        style("debounce").bold(),
        style("timeout").bold(),
        style("min-show").bold(),
        style("retries").bold(),
        style("flags").bold()
    );
    for (op, strategy) in &rows {
        println!(
            "{:<11} {:>7}ms {:>7}ms {:>7}ms {:>7}  {}",
            op.as_str(),
            strategy.debounce_ms,
            strategy.timeout_ms,
            strategy.min_show_ms,
            strategy.retry_count,
            flags(strategy)
        );
    }
    Ok(())
}

pub(crate) fn print_snapshot(snapshot: Option<&PerformanceSnapshot>) {
    match snapshot {
        Some(s) => {
            println!(
                "{} {} ({}), {:.1} Mbps, {}ms rtt, {:.1} GB, {} cores",
                style("Host:").bold(),
                s.effective_type,
                network_class(s),
                s.downlink,
                s.rtt,
                s.device_memory,
                s.hardware_concurrency
            );
            if s.is_low_end_device {
                println!("      {}", style("low-end device").yellow());
            }
        }
        None => println!(
            "{} not sampled (unscaled strategies)",
            style("Host:").bold()
        ),
    }
}

fn network_class(snapshot: &PerformanceSnapshot) -> &'static str {
    if snapshot.is_slow_network {
        "slow"
    } else if snapshot.is_fast_network() {
        "fast"
    } else {
        "normal"
    }
}

fn flags(strategy: &EffectiveStrategy) -> String {
    let mut flags = Vec::new();
    if strategy.use_skeleton {
        flags.push("skeleton");
    }
    if strategy.show_progress {
        flags.push("progress");
    }
    if strategy.performance_aware {
        flags.push("adaptive");
    }
    flags.join(",")
}
