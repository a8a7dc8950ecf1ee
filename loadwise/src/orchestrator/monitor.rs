//! Background tasks owned by the orchestrator.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controller::TimerController;
use crate::performance::PerformanceSampler;

/// A host report that network conditions changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkChange {
    /// Connection type or quality changed.
    Changed,
    /// The host came back online.
    Online,
    /// The host went offline.
    Offline,
}

/// Periodically remove operations that were never stopped.
pub(crate) async fn run_sweeper(
    controller: TimerController,
    interval: Duration,
    max_age: Duration,
    cancellation_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    debug!(
        interval_ms = interval.as_millis() as u64,
        max_age_secs = max_age.as_secs(),
        "Cleanup sweeper started"
    );

    loop {
        tokio::select! {
            biased;

            _ = cancellation_token.cancelled() => break,

            _ = ticker.tick() => {
                controller.sweep(max_age);
            }
        }
    }

    debug!("Cleanup sweeper stopped");
}

/// Re-sample performance on every network change so the next operation
/// started sees fresh figures.
pub(crate) async fn run_network_monitor(
    sampler: Arc<PerformanceSampler>,
    mut changes: mpsc::UnboundedReceiver<NetworkChange>,
    cancellation_token: CancellationToken,
) {
    debug!("Network monitor started");

    loop {
        tokio::select! {
            biased;

            _ = cancellation_token.cancelled() => break,

            change = changes.recv() => {
                let Some(change) = change else { break };
                info!(?change, "Network change reported");
                sampler.notify_network_change();
            }
        }
    }

    debug!("Network monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::{NetworkInfo, NetworkType, StaticProbe};
    use crate::registry::{LoadingState, Registry};
    use crate::strategy::{EffectiveStrategy, OperationType, Priority};
    use crate::telemetry::OrchestratorMetrics;
    use crate::{OperationHooks, RetrySettings};
    use tokio::runtime::Handle;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_stale_records() {
        let registry = Arc::new(Registry::new(16));
        let metrics = Arc::new(OrchestratorMetrics::new());
        let controller = TimerController::new(registry.clone(), metrics, Handle::current());
        let strategy = EffectiveStrategy {
            debounce_ms: 0,
            timeout_ms: 0,
            min_show_ms: 0,
            use_skeleton: false,
            show_progress: false,
            retry_count: 0,
            performance_aware: false,
        };
        controller.start(
            LoadingState::new("leak", OperationType::Data, Priority::Low, strategy),
            RetrySettings::default(),
            OperationHooks::new(),
        );

        let token = CancellationToken::new();
        let task = tokio::spawn(run_sweeper(
            controller.clone(),
            Duration::from_secs(60),
            Duration::from_secs(300),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(250)).await;
        assert!(registry.contains("leak"));

        // Next tick after the record passes 300s is at 360s
        tokio::time::sleep(Duration::from_secs(115)).await;
        assert!(!registry.contains("leak"));
        assert!(controller.is_empty());

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_network_monitor_resamples() {
        let probe = Arc::new(StaticProbe::fast());
        let sampler = PerformanceSampler::new(probe.clone(), Duration::from_secs(30));
        let sampler = Arc::new(sampler);
        let first = sampler.sample();
        let mut updates = sampler.subscribe();
        updates.borrow_and_update();

        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let task = tokio::spawn(run_network_monitor(sampler.clone(), rx, token.clone()));

        probe.set_network(Some(NetworkInfo::new(NetworkType::Slow2g, 0.1, 900)));
        tx.send(NetworkChange::Changed).unwrap();

        updates.changed().await.unwrap();
        let latest = updates.borrow().clone();
        assert!(latest.is_slow_network);
        assert!(latest.version > first.version);

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_network_monitor_exits_when_senders_drop() {
        let probe = Arc::new(StaticProbe::fast());
        let sampler = Arc::new(PerformanceSampler::new(probe, Duration::from_secs(30)));
        let (tx, rx) = mpsc::unbounded_channel::<NetworkChange>();
        let task = tokio::spawn(run_network_monitor(sampler, rx, CancellationToken::new()));
        drop(tx);
        task.await.unwrap();
    }
}
