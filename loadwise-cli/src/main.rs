//! Loadwise CLI - inspect and exercise the loading orchestrator
//!
//! This binary provides a command-line interface to the loadwise library:
//! what-if strategy tables for a given host, load-time estimates, a scripted
//! simulation that streams registry events, and the effective configuration.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;
use loadwise::logging::{init_logging, LoggingConfig, Verbosity};

use commands::config::ConfigArgs;
use commands::estimate::EstimateArgs;
use commands::simulate::SimulateArgs;
use commands::strategy::StrategyArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "loadwise")]
#[command(version, about = "Adaptive loading orchestration", long_about = None)]
struct Cli {
    /// Show debug output for every operation transition
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Disable coloured log output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (INI)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the effective loading strategy for an operation type
    Strategy(StrategyArgs),

    /// Estimate how long a payload takes to load
    Estimate(EstimateArgs),

    /// Run a scripted workload and stream registry events
    Simulate(SimulateArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let _logging_guard = init_logging(&LoggingConfig {
        verbosity: Verbosity::from_flags(cli.verbose, cli.quiet),
        file: cli.log_file.clone(),
        no_color: cli.no_color,
    })?;

    let config = commands::common::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Strategy(args) => commands::strategy::run(args, &config),
        Commands::Estimate(args) => commands::estimate::run(args, &config),
        Commands::Simulate(args) => commands::simulate::run(args, config),
        Commands::Config(args) => commands::config::run(args, &config),
    }
}
