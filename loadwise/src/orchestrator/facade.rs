//! The orchestrator façade.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::batch::BatchLoading;
use super::guard::LoadingGuard;
use super::monitor::{self, NetworkChange};
use crate::config::OrchestratorConfig;
use crate::controller::{OperationHooks, OperationStatus, RetrySettings, TimerController};
use crate::error::LoadingError;
use crate::performance::{HostProbe, LoadClass, PerformanceSampler, PerformanceSnapshot};
use crate::registry::{LoadingState, Registry, RegistryEvent};
use crate::strategy::{
    EffectiveStrategy, OperationType, Priority, StrategyCalculator, StrategyOverrides,
};
use crate::telemetry::{MetricsSnapshot, OrchestratorMetrics};

/// Optional parameters for [`LoadingOrchestrator::start_with`].
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Initial status text.
    pub text: Option<String>,
    /// Strategy fields that win over the computed values.
    pub overrides: Option<StrategyOverrides>,
    /// Caller's duration hint, stored on the record.
    pub estimated_duration: Option<Duration>,
    /// Retry settings; the configured defaults when `None`.
    pub retry: Option<RetrySettings>,
    /// Timeout, retry and failure callbacks.
    pub hooks: OperationHooks,
}

impl StartOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn overrides(mut self, overrides: StrategyOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn estimated_duration(mut self, estimate: Duration) -> Self {
        self.estimated_duration = Some(estimate);
        self
    }

    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn hooks(mut self, hooks: OperationHooks) -> Self {
        self.hooks = hooks;
        self
    }
}

struct Inner {
    config: OrchestratorConfig,
    sampler: Arc<PerformanceSampler>,
    registry: Arc<Registry>,
    controller: TimerController,
    metrics: Arc<OrchestratorMetrics>,
    network_tx: Option<mpsc::UnboundedSender<NetworkChange>>,
    cancellation_token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

/// Entry point for callers: starts, stops and observes loading operations.
///
/// Cheap to clone; all clones share one registry, sampler and controller.
/// Commands naming an unknown id are silent no-ops.
///
/// # Example
///
/// ```ignore
/// let probe = Arc::new(SystemProbe::new());
/// let orchestrator = LoadingOrchestrator::init(OrchestratorConfig::default(), probe)?;
///
/// let strategy = orchestrator.start("users", OperationType::Api, Priority::High);
/// orchestrator.update_progress("users", 50.0);
/// orchestrator.stop("users");
/// ```
#[derive(Clone)]
pub struct LoadingOrchestrator {
    inner: Arc<Inner>,
}

impl fmt::Debug for LoadingOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingOrchestrator")
            .field("config", &self.inner.config)
            .field("controller", &self.inner.controller)
            .field("registry", &self.inner.registry)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl LoadingOrchestrator {
    /// Create an orchestrator on the current Tokio runtime.
    ///
    /// Spawns the cleanup sweeper and the network monitor when enabled.
    ///
    /// # Errors
    ///
    /// Returns [`LoadingError::NoRuntime`] outside a Tokio runtime and
    /// [`LoadingError::Config`] for an invalid configuration.
    pub fn init(
        config: OrchestratorConfig,
        probe: Arc<dyn HostProbe>,
    ) -> Result<Self, LoadingError> {
        config.validate()?;
        let handle = Handle::try_current().map_err(|e| LoadingError::NoRuntime(e.to_string()))?;

        let sampler = Arc::new(PerformanceSampler::new(probe, config.snapshot_ttl()));
        let registry = Arc::new(Registry::new(config.event_capacity));
        let metrics = Arc::new(OrchestratorMetrics::new());
        let controller = TimerController::new(registry.clone(), metrics.clone(), handle.clone());
        let cancellation_token = CancellationToken::new();
        let mut tasks = Vec::new();

        if config.auto_cleanup {
            tasks.push(handle.spawn(monitor::run_sweeper(
                controller.clone(),
                config.cleanup_interval(),
                config.max_operation_age(),
                cancellation_token.child_token(),
            )));
        }

        let network_tx = if config.network_monitoring {
            let (tx, rx) = mpsc::unbounded_channel();
            tasks.push(handle.spawn(monitor::run_network_monitor(
                sampler.clone(),
                rx,
                cancellation_token.child_token(),
            )));
            Some(tx)
        } else {
            None
        };

        info!(
            performance_aware = config.performance_aware,
            network_monitoring = config.network_monitoring,
            auto_cleanup = config.auto_cleanup,
            cleanup_interval_ms = config.cleanup_interval_ms,
            "Loading orchestrator initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                sampler,
                registry,
                controller,
                metrics,
                network_tx,
                cancellation_token,
                tasks: Mutex::new(tasks),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Stop background tasks, cancel every operation and empty the registry.
    ///
    /// Idempotent. Commands issued afterwards still work but no background
    /// sweeping or network monitoring happens.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.cancellation_token.cancel();
        let tasks = std::mem::take(&mut *self.inner.tasks.lock());
        let cleared = self.inner.controller.clear_all();
        info!(
            cleared,
            tasks = tasks.len(),
            metrics = %self.inner.metrics.snapshot(),
            "Loading orchestrator disposed"
        );
    }

    /// Whether `dispose` has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Start an operation with default options. Returns the bound strategy.
    pub fn start(
        &self,
        id: impl Into<String>,
        op_type: OperationType,
        priority: Priority,
    ) -> EffectiveStrategy {
        self.start_with(id, op_type, priority, StartOptions::default())
    }

    /// Start an operation. Re-starting a running id replaces it.
    ///
    /// The strategy is computed once, from the performance snapshot current
    /// at this call, and is never recomputed while the operation runs.
    pub fn start_with(
        &self,
        id: impl Into<String>,
        op_type: OperationType,
        priority: Priority,
        options: StartOptions,
    ) -> EffectiveStrategy {
        let id = id.into();
        let snapshot = self.sample_if_aware();
        let strategy = StrategyCalculator::calculate(
            op_type,
            priority,
            snapshot.as_ref(),
            options.overrides.as_ref(),
        );
        let snapshot_version = snapshot
            .filter(|_| strategy.performance_aware)
            .map(|s| s.version);

        debug!(
            id = %id,
            op_type = %op_type,
            priority = %priority,
            snapshot_version,
            strategy = %strategy,
            "Starting operation"
        );

        let record = LoadingState::new(id, op_type, priority, strategy)
            .with_text(options.text)
            .with_estimated_duration(options.estimated_duration)
            .with_snapshot_version(snapshot_version);
        let retry = options
            .retry
            .unwrap_or_else(|| self.inner.config.retry_settings());
        self.inner.controller.start(record, retry, options.hooks);
        strategy
    }

    /// Complete an operation, honouring its minimum show time.
    pub fn stop(&self, id: &str) -> bool {
        self.inner.controller.stop(id)
    }

    /// Remove an operation immediately.
    pub fn cancel(&self, id: &str) -> bool {
        self.inner.controller.cancel(id)
    }

    /// Retry an operation now. Returns `false` when no budget remains or the
    /// operation is not in a retryable phase.
    pub fn retry(&self, id: &str) -> bool {
        self.inner.controller.retry(id)
    }

    /// Report progress (clamped to `[0, 100]`).
    pub fn update_progress(&self, id: &str, value: f64) {
        self.inner.controller.update_progress(id, value);
    }

    /// Replace the status text.
    pub fn update_text(&self, id: &str, text: &str) {
        self.inner.controller.update_text(id, text);
    }

    /// Mark an operation failed. The record stays until stopped.
    pub fn set_error(&self, id: &str, message: &str) -> bool {
        self.inner.controller.set_error(id, message)
    }

    /// Cancel every operation. Returns how many were cancelled.
    pub fn clear_all(&self) -> usize {
        self.inner.controller.clear_all()
    }

    /// Registry record for `id`. `None` while debouncing or after stop.
    pub fn state(&self, id: &str) -> Option<LoadingState> {
        self.inner.registry.get(id)
    }

    /// Every registry record, oldest first.
    pub fn states(&self) -> Vec<LoadingState> {
        self.inner.registry.snapshot()
    }

    /// Whether any visible operation is loading.
    pub fn is_global_loading(&self) -> bool {
        self.inner.registry.is_global_loading()
    }

    /// Subscribe to registry changes.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.registry.subscribe()
    }

    /// Controller view of an operation, including debouncing ones.
    pub fn operation_status(&self, id: &str) -> Option<OperationStatus> {
        self.inner.controller.status(id)
    }

    /// The strategy a new operation would get right now.
    pub fn strategy_for(&self, op_type: OperationType, priority: Priority) -> EffectiveStrategy {
        let snapshot = self.sample_if_aware();
        StrategyCalculator::calculate(op_type, priority, snapshot.as_ref(), None)
    }

    /// Estimate how long a payload takes to load under current conditions.
    pub fn estimate_load_time(&self, size_bytes: u64, class: LoadClass) -> Duration {
        self.inner.sampler.estimate_load_time(size_bytes, class)
    }

    /// Report a host network change.
    ///
    /// Goes through the monitor task when network monitoring is enabled,
    /// otherwise re-samples inline.
    pub fn notify_network_change(&self, change: NetworkChange) {
        match &self.inner.network_tx {
            Some(tx) if tx.send(change).is_ok() => {}
            _ => {
                self.inner.sampler.notify_network_change();
            }
        }
    }

    /// Sender for host network-change events, when monitoring is enabled.
    pub fn network_events(&self) -> Option<mpsc::UnboundedSender<NetworkChange>> {
        self.inner.network_tx.clone()
    }

    /// Coordinate a group of operations.
    pub fn batch<I, S>(&self, ids: I) -> BatchLoading
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BatchLoading::new(self.clone(), ids.into_iter().map(Into::into).collect())
    }

    /// Start an operation that stops when the returned guard drops.
    pub fn guard(
        &self,
        id: impl Into<String>,
        op_type: OperationType,
        priority: Priority,
    ) -> LoadingGuard {
        self.guard_with(id, op_type, priority, StartOptions::default())
    }

    /// [`guard`](Self::guard) with options.
    pub fn guard_with(
        &self,
        id: impl Into<String>,
        op_type: OperationType,
        priority: Priority,
        options: StartOptions,
    ) -> LoadingGuard {
        let id = id.into();
        let strategy = self.start_with(id.clone(), op_type, priority, options);
        LoadingGuard::new(self.clone(), id, strategy)
    }

    /// The performance sampler.
    pub fn sampler(&self) -> &Arc<PerformanceSampler> {
        &self.inner.sampler
    }

    /// The operation registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    fn sample_if_aware(&self) -> Option<PerformanceSnapshot> {
        if self.inner.config.performance_aware {
            Some(self.inner.sampler.sample())
        } else {
            None
        }
    }
}
