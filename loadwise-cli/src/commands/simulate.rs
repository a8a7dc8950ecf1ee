//! `loadwise simulate`: run a scripted workload and stream registry events.

use std::time::Duration;

use clap::Args;
use console::style;
use loadwise::{
    LoadingOrchestrator, OperationHooks, OperationPhase, OperationType, OrchestratorConfig,
    Priority, RegistryEvent, RetrySettings, StartOptions, StrategyOverrides,
};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

use super::common::HostArgs;
use crate::error::CliError;

/// Arguments for the simulate command.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Give up after this many seconds
    #[arg(long, default_value_t = 15, value_name = "SECS")]
    pub max_secs: u64,

    /// Timeout applied to operations that never finish
    #[arg(long, default_value_t = 1000, value_name = "MS")]
    pub hang_timeout_ms: u64,

    #[command(flatten)]
    pub host: HostArgs,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success,
    Failure(&'static str),
    Hang,
}

#[derive(Debug, Clone, Copy)]
struct ScriptedOperation {
    id: &'static str,
    op_type: OperationType,
    priority: Priority,
    start_after_ms: u64,
    duration_ms: u64,
    outcome: Outcome,
}

const SCRIPT: &[ScriptedOperation] = &[
    ScriptedOperation {
        id: "quick-widget",
        op_type: OperationType::Widget,
        priority: Priority::Medium,
        start_after_ms: 0,
        duration_ms: 40,
        outcome: Outcome::Success,
    },
    ScriptedOperation {
        id: "dashboard",
        op_type: OperationType::Page,
        priority: Priority::High,
        start_after_ms: 0,
        duration_ms: 800,
        outcome: Outcome::Success,
    },
    ScriptedOperation {
        id: "stock-api",
        op_type: OperationType::Api,
        priority: Priority::Medium,
        start_after_ms: 100,
        duration_ms: 1200,
        outcome: Outcome::Success,
    },
    ScriptedOperation {
        id: "avatar",
        op_type: OperationType::Image,
        priority: Priority::Low,
        start_after_ms: 200,
        duration_ms: 900,
        outcome: Outcome::Failure("Image not found"),
    },
    ScriptedOperation {
        id: "report",
        op_type: OperationType::Data,
        priority: Priority::Critical,
        start_after_ms: 300,
        duration_ms: 0,
        outcome: Outcome::Hang,
    },
];

/// How long a failed operation stays on screen before it is dismissed.
const ERROR_DISPLAY: Duration = Duration::from_millis(500);

/// Run the simulate command on a fresh runtime.
pub fn run(args: SimulateArgs, config: OrchestratorConfig) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(simulate(args, config))
}

async fn simulate(args: SimulateArgs, config: OrchestratorConfig) -> Result<(), CliError> {
    let orchestrator = LoadingOrchestrator::init(config, args.host.probe())?;
    let mut events = orchestrator.subscribe();
    let started = Instant::now();
    let hang_timeout = Duration::from_millis(args.hang_timeout_ms);

    let tasks: Vec<JoinHandle<()>> = SCRIPT
        .iter()
        .map(|op| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(drive(orchestrator, *op, hang_timeout, args.json))
        })
        .collect();

    let deadline = tokio::time::sleep(Duration::from_secs(args.max_secs));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping simulation");
                break;
            }
            _ = &mut deadline => {
                warn!(max_secs = args.max_secs, "Simulation deadline reached");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => print_event(started, &event, args.json),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }

        if tasks.iter().all(|t| t.is_finished()) && orchestrator.states().is_empty() {
            break;
        }
    }

    for task in &tasks {
        task.abort();
    }

    let metrics = orchestrator.metrics();
    if args.json {
        println!("{}", json!({ "metrics": metrics }));
    } else {
        println!();
        println!("{} {}", style("Metrics:").bold(), metrics);
    }
    orchestrator.dispose();
    Ok(())
}

/// Play one scripted operation against the orchestrator.
async fn drive(
    orchestrator: LoadingOrchestrator,
    op: ScriptedOperation,
    hang_timeout: Duration,
    json: bool,
) {
    tokio::time::sleep(Duration::from_millis(op.start_after_ms)).await;

    let mut options = StartOptions::new().text(format!("Loading {}", op.id));
    if let Outcome::Hang = op.outcome {
        let overrides = StrategyOverrides::new()
            .timeout(hang_timeout)
            .retry_count(2);
        let hooks = OperationHooks::new()
            .on_timeout(move |id, attempt| {
                if !json {
                    let mark = style("!").yellow();
                    println!("           {mark} {id} attempt {attempt} timed out");
                }
            })
            .on_final_failure(move |id, message| {
                if !json {
                    println!("           {} {} {}", style("x").red(), id, message);
                }
            });
        options = options
            .overrides(overrides)
            .retry(RetrySettings::fixed(Duration::from_millis(250)))
            .hooks(hooks);
    }
    orchestrator.start_with(op.id, op.op_type, op.priority, options);

    match op.outcome {
        Outcome::Success => {
            let step = Duration::from_millis(op.duration_ms / 4);
            for quarter in 1..=4 {
                tokio::time::sleep(step).await;
                orchestrator.update_progress(op.id, f64::from(quarter) * 25.0);
            }
            orchestrator.stop(op.id);
        }
        Outcome::Failure(message) => {
            tokio::time::sleep(Duration::from_millis(op.duration_ms)).await;
            orchestrator.set_error(op.id, message);
            tokio::time::sleep(ERROR_DISPLAY).await;
            orchestrator.stop(op.id);
        }
        Outcome::Hang => loop {
            tokio::time::sleep(Duration::from_millis(100)).await;
            match orchestrator.operation_status(op.id) {
                Some(status) if status.phase == OperationPhase::Failed => {
                    tokio::time::sleep(ERROR_DISPLAY).await;
                    orchestrator.stop(op.id);
                    break;
                }
                Some(_) => {}
                None => break,
            }
        },
    }
}

fn print_event(started: Instant, event: &RegistryEvent, json: bool) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let ids = event.ids.join(",");

    if json {
        let line = json!({
            "elapsed_ms": elapsed_ms,
            "kind": event.kind.to_string(),
            "ids": event.ids,
            "state": event.state,
            "global_loading": event.global_loading,
        });
        println!("{}", line);
        return;
    }

    let detail = match &event.state {
        Some(state) if state.error.is_some() => {
            let error = state.error.clone().unwrap_or_default();
            style(error).red().to_string()
        }
        Some(state) => match state.progress {
            Some(progress) => format!("{:.0}%", progress),
            None => state.text.clone().unwrap_or_default(),
        },
        None => String::new(),
    };
    let global = if event.global_loading {
        style("loading").cyan()
    } else {
        style("idle").dim()
    };
    println!(
        "[{:>6}ms] {:<9} {:<14} {:<8} {}",
        elapsed_ms,
        event.kind.to_string(),
        ids,
        global,
        detail
    );
}
