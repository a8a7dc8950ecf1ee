//! Per-operation timer state machine.
//!
//! Each operation id owns one slot holding its phase and at most one armed
//! timer (debounce, timeout, retry backoff or minimum-show). Every transition
//! disarms the current timer before arming the next, and every timer carries
//! a sequence number checked on fire, so a timer that loses a race with
//! `stop`/`cancel` can never resurrect an operation.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::hooks::{HookCall, OperationHooks};
use super::retry::RetrySettings;
use super::status::{OperationPhase, OperationStatus};
use crate::registry::{clamp_progress, LoadingState, Registry};
use crate::strategy::EffectiveStrategy;
use crate::telemetry::OrchestratorMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Debounce,
    Timeout,
    Retry,
    MinShow,
}

struct Slot {
    phase: OperationPhase,
    /// Record template; holds progress/text set while debouncing.
    record: LoadingState,
    retry: RetrySettings,
    hooks: OperationHooks,
    attempt: u32,
    timeouts: u32,
    is_timed_out: bool,
    visible_since: Option<Instant>,
    timer: Option<AbortHandle>,
    /// Sequence of the armed timer; 0 when none is armed.
    timer_seq: u64,
}

impl Slot {
    fn new(record: LoadingState, retry: RetrySettings, hooks: OperationHooks) -> Self {
        Self {
            phase: OperationPhase::Debouncing,
            record,
            retry,
            hooks,
            attempt: 0,
            timeouts: 0,
            is_timed_out: false,
            visible_since: None,
            timer: None,
            timer_seq: 0,
        }
    }

    fn strategy(&self) -> &EffectiveStrategy {
        &self.record.strategy
    }

    fn budget(&self) -> u32 {
        self.retry.budget(&self.record.strategy)
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.timer_seq = 0;
    }

    fn status(&self) -> OperationStatus {
        OperationStatus {
            phase: self.phase,
            attempt: self.attempt,
            timeouts: self.timeouts,
            is_timed_out: self.is_timed_out,
            retry_budget: self.budget(),
        }
    }
}

struct Shared {
    registry: Arc<Registry>,
    metrics: Arc<OrchestratorMetrics>,
    handle: Handle,
    slots: Mutex<HashMap<String, Slot>>,
    seq: AtomicU64,
}

/// Drives debounce, timeout, retry and minimum-show timing for every
/// operation, and is the only writer of lifecycle commands to the
/// [`Registry`].
///
/// Lock order is slot table, then registry. Hooks run after both locks are
/// released.
#[derive(Clone)]
pub struct TimerController {
    shared: Arc<Shared>,
}

impl fmt::Debug for TimerController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerController")
            .field("operations", &self.shared.slots.lock().len())
            .finish_non_exhaustive()
    }
}

impl TimerController {
    /// Create a controller that spawns its timers on `handle`.
    pub fn new(registry: Arc<Registry>, metrics: Arc<OrchestratorMetrics>, handle: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry,
                metrics,
                handle,
                slots: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// The registry this controller writes to.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.shared.registry
    }

    /// Begin an operation. An existing operation with the same id is
    /// cancelled first.
    ///
    /// With a zero debounce the record is shown before this returns.
    pub fn start(&self, record: LoadingState, retry: RetrySettings, hooks: OperationHooks) {
        let id = record.id.clone();
        let mut slots = self.shared.slots.lock();

        if let Some(mut previous) = slots.remove(&id) {
            previous.disarm();
            self.shared.registry.stop(&id);
            self.shared.metrics.operation_cancelled();
            debug!(id = %id, phase = %previous.phase, "Restarting operation");
        }

        self.shared.metrics.operation_started();
        let mut slot = Slot::new(record, retry, hooks);
        let debounce = slot.strategy().debounce();
        if debounce.is_zero() {
            self.reveal(&id, &mut slot);
        } else {
            debug!(id = %id, debounce_ms = debounce.as_millis() as u64, "Operation debouncing");
            self.arm(&id, &mut slot, debounce, TimerKind::Debounce);
        }
        slots.insert(id, slot);
    }

    /// Complete an operation.
    ///
    /// A debouncing operation is dropped without ever reaching the registry.
    /// A visible one is removed once it has been visible for its minimum show
    /// time. Returns `false` for an unknown id.
    pub fn stop(&self, id: &str) -> bool {
        let mut slots = self.shared.slots.lock();
        let Some(mut slot) = slots.remove(id) else {
            return false;
        };

        match slot.phase {
            OperationPhase::Debouncing => {
                slot.disarm();
                self.shared.metrics.operation_suppressed();
                debug!(id, "Operation finished within debounce, never shown");
            }
            OperationPhase::Stopping => {
                slots.insert(id.to_string(), slot);
            }
            OperationPhase::Failed => {
                slot.disarm();
                self.shared.registry.stop(id);
                debug!(id, "Failed operation acknowledged");
            }
            OperationPhase::Visible | OperationPhase::RetryPending => {
                slot.disarm();
                slot.is_timed_out = false;
                let min_show = slot.strategy().min_show_time();
                let shown = slot.visible_since.map(|t| t.elapsed()).unwrap_or_default();
                if shown >= min_show {
                    self.shared.registry.stop(id);
                    self.shared.metrics.operation_completed();
                    debug!(
                        id,
                        shown_ms = shown.as_millis() as u64,
                        "Operation completed"
                    );
                } else {
                    let remaining = min_show - shown;
                    slot.phase = OperationPhase::Stopping;
                    debug!(
                        id,
                        remaining_ms = remaining.as_millis() as u64,
                        "Operation completed, holding for minimum show time"
                    );
                    self.arm(id, &mut slot, remaining, TimerKind::MinShow);
                    slots.insert(id.to_string(), slot);
                }
            }
        }
        true
    }

    /// Tear an operation down immediately, ignoring the minimum show time.
    /// Returns whether anything was removed.
    pub fn cancel(&self, id: &str) -> bool {
        let mut slots = self.shared.slots.lock();
        let slot = slots.remove(id).map(|mut slot| {
            slot.disarm();
            slot
        });
        let had_record = self.shared.registry.stop(id);
        if let Some(slot) = &slot {
            self.shared.metrics.operation_cancelled();
            debug!(id, phase = %slot.phase, "Operation cancelled");
        }
        slot.is_some() || had_record
    }

    /// Retry an operation now instead of waiting for its timeout.
    ///
    /// Allowed while the operation is visible, waiting on a backoff delay, or
    /// failed, as long as retry budget remains. A failed operation has its
    /// error cleared and becomes loading again.
    pub fn retry(&self, id: &str) -> bool {
        let mut calls = Vec::new();
        let retried = {
            let mut slots = self.shared.slots.lock();
            let Some(mut slot) = slots.remove(id) else {
                return false;
            };

            let retried = match slot.phase {
                OperationPhase::RetryPending => {
                    slot.disarm();
                    self.begin_retry(id, &mut slot, &mut calls);
                    true
                }
                OperationPhase::Visible | OperationPhase::Failed
                    if slot.attempt < slot.budget() =>
                {
                    slot.disarm();
                    if slot.phase == OperationPhase::Failed {
                        let mut record = self
                            .shared
                            .registry
                            .get(id)
                            .unwrap_or_else(|| slot.record.clone());
                        record.error = None;
                        record.is_loading = true;
                        self.shared.registry.start(record);
                    }
                    slot.attempt += 1;
                    self.shared.metrics.retry_scheduled();
                    self.begin_retry(id, &mut slot, &mut calls);
                    true
                }
                _ => false,
            };
            slots.insert(id.to_string(), slot);
            retried
        };

        for call in calls {
            call.invoke();
        }
        retried
    }

    /// Set a terminal error. A debouncing operation is shown first so the
    /// error is visible. Pending timers are cancelled.
    pub fn set_error(&self, id: &str, message: &str) -> bool {
        let mut slots = self.shared.slots.lock();
        let Some(mut slot) = slots.remove(id) else {
            return false;
        };

        if slot.phase == OperationPhase::Debouncing {
            self.shared.registry.start(slot.record.clone());
            slot.visible_since = Some(Instant::now());
            self.shared.metrics.operation_revealed();
        }
        slot.is_timed_out = false;
        self.fail(id, &mut slot, message);
        debug!(id, error = message, "Operation failed by caller");
        slots.insert(id.to_string(), slot);
        true
    }

    /// Record progress. While debouncing the value is kept for the reveal.
    pub fn update_progress(&self, id: &str, value: f64) {
        let mut slots = self.shared.slots.lock();
        if let Some(slot) = slots.get_mut(id) {
            if slot.phase == OperationPhase::Debouncing {
                if let Some(progress) = clamp_progress(value) {
                    slot.record.progress = Some(progress);
                }
                return;
            }
        }
        self.shared.registry.set_progress(id, value);
    }

    /// Record status text. While debouncing the value is kept for the reveal.
    pub fn update_text(&self, id: &str, text: &str) {
        let mut slots = self.shared.slots.lock();
        if let Some(slot) = slots.get_mut(id) {
            if slot.phase == OperationPhase::Debouncing {
                slot.record.text = Some(text.to_string());
                return;
            }
        }
        self.shared.registry.set_text(id, text);
    }

    /// Cancel every operation and empty the registry. Returns how many
    /// operations were cancelled.
    pub fn clear_all(&self) -> usize {
        let mut slots = self.shared.slots.lock();
        let count = slots.len();
        for (_, mut slot) in slots.drain() {
            slot.disarm();
            self.shared.metrics.operation_cancelled();
        }
        self.shared.registry.clear();
        if count > 0 {
            debug!(count, "All operations cleared");
        }
        count
    }

    /// Remove operations older than `max_age`, visible or not. Returns the
    /// removed ids.
    pub fn sweep(&self, max_age: Duration) -> Vec<String> {
        let mut slots = self.shared.slots.lock();
        let now = Instant::now();

        let mut swept = self.shared.registry.sweep(max_age);
        // Debouncing operations have no registry record yet.
        swept.extend(
            slots
                .iter()
                .filter(|(_, s)| {
                    s.phase == OperationPhase::Debouncing && s.record.age(now) > max_age
                })
                .map(|(id, _)| id.clone()),
        );

        for id in &swept {
            if let Some(mut slot) = slots.remove(id) {
                slot.disarm();
            }
        }
        if !swept.is_empty() {
            self.shared.metrics.records_swept(swept.len());
            warn!(count = swept.len(), ids = ?swept, "Swept operations that were never stopped");
        }
        swept
    }

    /// Controller view of one operation.
    pub fn status(&self, id: &str) -> Option<OperationStatus> {
        self.shared.slots.lock().get(id).map(Slot::status)
    }

    /// Strategy bound to a running operation.
    pub fn strategy(&self, id: &str) -> Option<EffectiveStrategy> {
        self.shared.slots.lock().get(id).map(|s| *s.strategy())
    }

    /// Whether the controller tracks `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.shared.slots.lock().contains_key(id)
    }

    /// Number of tracked operations, including debouncing ones.
    pub fn len(&self) -> usize {
        self.shared.slots.lock().len()
    }

    /// Whether no operation is tracked.
    pub fn is_empty(&self) -> bool {
        self.shared.slots.lock().is_empty()
    }

    fn reveal(&self, id: &str, slot: &mut Slot) {
        self.shared.registry.start(slot.record.clone());
        slot.phase = OperationPhase::Visible;
        slot.visible_since = Some(Instant::now());
        self.shared.metrics.operation_revealed();
        debug!(id, strategy = %slot.strategy(), "Operation visible");
        self.arm_timeout(id, slot);
    }

    fn arm_timeout(&self, id: &str, slot: &mut Slot) {
        let timeout = slot.strategy().timeout();
        if timeout.is_zero() {
            slot.disarm();
        } else {
            self.arm(id, slot, timeout, TimerKind::Timeout);
        }
    }

    fn begin_retry(&self, id: &str, slot: &mut Slot, calls: &mut Vec<HookCall>) {
        slot.is_timed_out = false;
        slot.phase = OperationPhase::Visible;
        calls.extend(slot.hooks.retry_call(id, slot.attempt));
        debug!(id, attempt = slot.attempt, "Retrying operation");
        self.arm_timeout(id, slot);
    }

    fn handle_timeout(&self, id: &str, slot: &mut Slot, calls: &mut Vec<HookCall>) {
        slot.timeouts += 1;
        slot.is_timed_out = true;
        self.shared.metrics.timeout_fired();

        let attempt = slot.attempt + 1;
        calls.extend(slot.hooks.timeout_call(id, attempt));

        let budget = slot.budget();
        if slot.attempt < budget {
            let delay = slot.retry.delay_for_retry(slot.attempt);
            slot.attempt += 1;
            slot.phase = OperationPhase::RetryPending;
            self.shared.metrics.retry_scheduled();
            debug!(
                id,
                attempt = slot.attempt,
                budget,
                delay_ms = delay.as_millis() as u64,
                "Operation timed out, retry scheduled"
            );
            self.arm(id, slot, delay, TimerKind::Retry);
        } else {
            let message = format!("Loading timed out after {} attempts", attempt);
            self.fail(id, slot, &message);
            calls.extend(slot.hooks.failure_call(id, &message));
            warn!(
                id,
                attempts = attempt,
                "Operation failed, retry budget exhausted"
            );
        }
    }

    fn fail(&self, id: &str, slot: &mut Slot, message: &str) {
        slot.disarm();
        self.shared.registry.set_error(id, message);
        slot.phase = OperationPhase::Failed;
        self.shared.metrics.operation_failed();
    }

    fn fire(&self, id: &str, seq: u64, kind: TimerKind) {
        let mut calls = Vec::new();
        {
            let mut slots = self.shared.slots.lock();
            let Some(slot) = slots.get_mut(id) else {
                return;
            };
            if slot.timer_seq != seq {
                return;
            }
            slot.timer = None;
            slot.timer_seq = 0;

            match (kind, slot.phase) {
                (TimerKind::Debounce, OperationPhase::Debouncing) => self.reveal(id, slot),
                (TimerKind::Timeout, OperationPhase::Visible) => {
                    self.handle_timeout(id, slot, &mut calls)
                }
                (TimerKind::Retry, OperationPhase::RetryPending) => {
                    self.begin_retry(id, slot, &mut calls)
                }
                (TimerKind::MinShow, OperationPhase::Stopping) => {
                    slots.remove(id);
                    self.shared.registry.stop(id);
                    self.shared.metrics.operation_completed();
                    debug!(id, "Operation completed after minimum show time");
                }
                (kind, phase) => {
                    debug!(id, ?kind, %phase, "Ignoring timer for a phase it does not apply to");
                }
            }
        }

        for call in calls {
            call.invoke();
        }
    }

    fn arm(&self, id: &str, slot: &mut Slot, delay: Duration, kind: TimerKind) {
        slot.disarm();
        let seq = self.shared.seq.fetch_add(1, Ordering::Relaxed) + 1;
        slot.timer_seq = seq;

        let shared = Arc::downgrade(&self.shared);
        let id = id.to_string();
        let task = self.shared.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                TimerController { shared }.fire(&id, seq, kind);
            }
        });
        slot.timer = Some(task.abort_handle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{OperationType, Priority, StrategyCalculator};

    fn controller() -> (TimerController, Arc<Registry>, Arc<OrchestratorMetrics>) {
        let registry = Arc::new(Registry::new(64));
        let metrics = Arc::new(OrchestratorMetrics::new());
        let controller = TimerController::new(registry.clone(), metrics.clone(), Handle::current());
        (controller, registry, metrics)
    }

    fn strategy(
        debounce_ms: u64,
        timeout_ms: u64,
        min_show_ms: u64,
        retry_count: u32,
    ) -> EffectiveStrategy {
        EffectiveStrategy {
            debounce_ms,
            timeout_ms,
            min_show_ms,
            use_skeleton: false,
            show_progress: false,
            retry_count,
            performance_aware: false,
        }
    }

    fn record(id: &str, strategy: EffectiveStrategy) -> LoadingState {
        LoadingState::new(id, OperationType::Api, Priority::Medium, strategy)
    }

    fn widget(id: &str) -> LoadingState {
        let strategy = StrategyCalculator::base_strategy(OperationType::Widget);
        LoadingState::new(id, OperationType::Widget, Priority::Medium, strategy)
    }

    /// Start with default retry settings and no hooks.
    fn start_plain(controller: &TimerController, record: LoadingState) {
        controller.start(record, RetrySettings::default(), OperationHooks::new());
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_within_debounce_never_shows() {
        let (controller, registry, metrics) = controller();
        let mut rx = registry.subscribe();

        start_plain(&controller, widget("w1"));
        sleep_ms(10).await;
        assert!(controller.stop("w1"));
        sleep_ms(500).await;

        assert!(rx.try_recv().is_err());
        assert!(registry.is_empty());
        assert!(!controller.contains("w1"));
        assert_eq!(metrics.snapshot().suppressed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_after_debounce() {
        let (controller, registry, _) = controller();
        start_plain(&controller, widget("w1"));

        sleep_ms(140).await;
        assert!(!registry.contains("w1"));
        assert_eq!(
            controller.status("w1").unwrap().phase,
            OperationPhase::Debouncing
        );

        sleep_ms(20).await;
        assert!(registry.get("w1").unwrap().is_loading);
        assert_eq!(
            controller.status("w1").unwrap().phase,
            OperationPhase::Visible
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_debounce_reveals_synchronously() {
        let (controller, registry, _) = controller();
        start_plain(&controller, record("p1", strategy(0, 0, 0, 0)));
        assert!(registry.contains("p1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_honours_min_show_time() {
        let (controller, registry, metrics) = controller();
        start_plain(&controller, record("m1", strategy(0, 0, 200, 0)));

        sleep_ms(50).await;
        controller.stop("m1");
        assert!(registry.contains("m1"));
        assert_eq!(
            controller.status("m1").unwrap().phase,
            OperationPhase::Stopping
        );

        sleep_ms(140).await;
        assert!(registry.contains("m1"));

        sleep_ms(20).await;
        assert!(!registry.contains("m1"));
        assert!(!controller.contains("m1"));
        assert_eq!(metrics.snapshot().completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_after_min_show_is_immediate() {
        let (controller, registry, _) = controller();
        start_plain(&controller, widget("w1"));
        sleep_ms(400).await;

        controller.stop("w1");
        assert!(!registry.contains("w1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_schedules_retry() {
        let (controller, registry, _) = controller();
        start_plain(&controller, record("a1", strategy(0, 1000, 0, 2)));

        sleep_ms(1010).await;
        let status = controller.status("a1").unwrap();
        assert_eq!(status.phase, OperationPhase::RetryPending);
        assert_eq!(status.timeouts, 1);
        assert_eq!(status.attempt, 1);
        assert!(status.is_timed_out);
        assert!(registry.get("a1").unwrap().is_loading);

        // First retry waits the base delay of 1000ms
        sleep_ms(1000).await;
        let status = controller.status("a1").unwrap();
        assert_eq!(status.phase, OperationPhase::Visible);
        assert!(!status.is_timed_out);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_sets_error_and_calls_hooks() {
        let (controller, registry, metrics) = controller();
        let timeouts = Arc::new(Mutex::new(Vec::new()));
        let retries = Arc::new(Mutex::new(Vec::new()));
        let failures = Arc::new(Mutex::new(Vec::new()));

        let hooks = {
            let timeouts = timeouts.clone();
            let retries = retries.clone();
            let failures = failures.clone();
            OperationHooks::new()
                .on_timeout(move |_, attempt| timeouts.lock().push(attempt))
                .on_retry(move |_, attempt| retries.lock().push(attempt))
                .on_final_failure(move |id, message| {
                    failures.lock().push((id.to_string(), message.to_string()))
                })
        };

        // Timeouts at 100, 1200 and 3300ms; retries at 1100 and 3200ms
        let retry = RetrySettings::default();
        controller.start(record("a1", strategy(0, 100, 0, 2)), retry, hooks);
        sleep_ms(4000).await;

        let record = registry.get("a1").unwrap();
        assert!(!record.is_loading);
        assert_eq!(
            record.error.as_deref(),
            Some("Loading timed out after 3 attempts")
        );

        let status = controller.status("a1").unwrap();
        assert_eq!(status.phase, OperationPhase::Failed);
        assert_eq!(status.timeouts, 3);

        assert_eq!(*timeouts.lock(), vec![1, 2, 3]);
        assert_eq!(*retries.lock(), vec![1, 2]);
        assert_eq!(failures.lock().len(), 1);
        assert_eq!(metrics.snapshot().failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_retry_wait_cancels_retry() {
        let (controller, registry, _) = controller();
        let retried = Arc::new(Mutex::new(0u32));
        let hooks = {
            let retried = retried.clone();
            OperationHooks::new().on_retry(move |_, _| *retried.lock() += 1)
        };
        let retry = RetrySettings::default();
        controller.start(record("a1", strategy(0, 1000, 0, 3)), retry, hooks);

        sleep_ms(1500).await;
        assert_eq!(
            controller.status("a1").unwrap().phase,
            OperationPhase::RetryPending
        );
        controller.stop("a1");

        sleep_ms(5000).await;
        assert!(!registry.contains("a1"));
        assert!(!controller.contains("a1"));
        assert_eq!(*retried.lock(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_error_during_debounce_reveals() {
        let (controller, registry, _) = controller();
        start_plain(&controller, widget("w1"));
        assert!(controller.set_error("w1", "Failed to load widget"));

        let record = registry.get("w1").unwrap();
        assert!(!record.is_loading);
        assert_eq!(record.error.as_deref(), Some("Failed to load widget"));

        // The debounce timer is gone and must not re-reveal the record.
        sleep_ms(500).await;
        assert!(!registry.get("w1").unwrap().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_retry_revives_failed_operation() {
        let (controller, registry, _) = controller();
        start_plain(&controller, record("a1", strategy(0, 0, 0, 1)));
        controller.set_error("a1", "boom");

        assert!(controller.retry("a1"));
        let record = registry.get("a1").unwrap();
        assert!(record.is_loading);
        assert!(record.error.is_none());
        assert_eq!(controller.status("a1").unwrap().attempt, 1);

        controller.set_error("a1", "boom again");
        assert!(!controller.retry("a1"), "budget exhausted");
        assert!(!controller.retry("missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_timers() {
        let (controller, _, metrics) = controller();
        start_plain(&controller, record("a1", strategy(0, 100, 0, 1)));
        sleep_ms(50).await;
        start_plain(&controller, record("a1", strategy(0, 1000, 0, 1)));

        sleep_ms(100).await;
        let status = controller.status("a1").unwrap();
        assert_eq!(status.timeouts, 0);
        assert_eq!(status.phase, OperationPhase::Visible);

        let counts = metrics.snapshot();
        assert_eq!(counts.started, 2);
        assert_eq!(counts.cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_error_counts_as_failure() {
        let (controller, _, metrics) = controller();
        start_plain(&controller, record("e1", strategy(0, 0, 0, 0)));
        start_plain(&controller, record("e2", strategy(0, 100, 0, 0)));

        controller.set_error("e1", "Server error");
        sleep_ms(150).await;

        let counts = metrics.snapshot();
        assert_eq!(counts.timeouts, 1);
        assert_eq!(counts.failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_during_debounce_are_carried() {
        let (controller, registry, _) = controller();
        start_plain(&controller, widget("w1"));
        controller.update_progress("w1", 140.0);
        controller.update_text("w1", "Almost there");
        assert!(!registry.contains("w1"));

        sleep_ms(200).await;
        let record = registry.get("w1").unwrap();
        assert_eq!(record.progress, Some(100.0));
        assert_eq!(record.text.as_deref(), Some("Almost there"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ignores_min_show() {
        let (controller, registry, metrics) = controller();
        start_plain(&controller, record("c1", strategy(0, 0, 5000, 0)));
        assert!(controller.cancel("c1"));
        assert!(!registry.contains("c1"));
        assert!(!controller.cancel("c1"));
        assert_eq!(metrics.snapshot().cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_ids_are_noops() {
        let (controller, registry, _) = controller();
        assert!(!controller.stop("ghost"));
        assert!(!controller.set_error("ghost", "x"));
        controller.update_progress("ghost", 10.0);
        controller.update_text("ghost", "x");
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_forgets_old_operations() {
        let (controller, registry, metrics) = controller();
        start_plain(&controller, record("old", strategy(0, 0, 0, 0)));
        start_plain(&controller, record("slow", strategy(600_000, 0, 0, 0)));
        sleep_ms(301_000).await;
        start_plain(&controller, record("new", strategy(0, 0, 0, 0)));

        let mut swept = controller.sweep(Duration::from_secs(300));
        swept.sort();
        assert_eq!(swept, vec!["old".to_string(), "slow".to_string()]);
        assert!(!controller.contains("old"));
        assert!(!controller.contains("slow"));
        assert!(registry.contains("new"));
        assert_eq!(metrics.snapshot().swept, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all() {
        let (controller, registry, _) = controller();
        start_plain(&controller, widget("w1"));
        start_plain(&controller, record("a1", strategy(0, 1000, 0, 1)));

        assert_eq!(controller.clear_all(), 2);
        assert!(controller.is_empty());
        assert!(registry.is_empty());

        sleep_ms(2000).await;
        assert!(registry.is_empty());
    }
}
