//! Atomic lifecycle counters.

use std::sync::atomic::{AtomicU64, Ordering};

use super::snapshot::MetricsSnapshot;

/// Lifecycle counters shared by the controller and the sweep daemon.
///
/// All updates use relaxed atomics; counters are independent and only ever
/// read as a best-effort snapshot.
#[derive(Debug, Default)]
pub struct OrchestratorMetrics {
    started: AtomicU64,
    revealed: AtomicU64,
    suppressed: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
    timeouts: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
    swept: AtomicU64,
}

impl OrchestratorMetrics {
    /// Create a metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// An operation was accepted by `start`.
    pub fn operation_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// An operation became visible in the registry.
    pub fn operation_revealed(&self) {
        self.revealed.fetch_add(1, Ordering::Relaxed);
    }

    /// An operation finished before its debounce elapsed and was never shown.
    pub fn operation_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// A visible operation was removed after a successful stop.
    pub fn operation_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// An operation was torn down by `cancel`, `clear_all` or a restart of its id.
    pub fn operation_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// A timeout timer fired.
    pub fn timeout_fired(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// A retry was scheduled (timeout-triggered or manual).
    pub fn retry_scheduled(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// An operation was marked failed (retry exhaustion or a caller error).
    pub fn operation_failed(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// `count` records were removed by the leak-guard sweep.
    pub fn records_swept(&self, count: usize) {
        self.swept.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            revealed: self.revealed.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_metrics_are_zero() {
        let snapshot = OrchestratorMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_increment_independently() {
        let metrics = OrchestratorMetrics::new();
        metrics.operation_started();
        metrics.operation_started();
        metrics.operation_suppressed();
        metrics.timeout_fired();
        metrics.retry_scheduled();
        metrics.records_swept(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.started, 2);
        assert_eq!(snapshot.suppressed, 1);
        assert_eq!(snapshot.timeouts, 1);
        assert_eq!(snapshot.retries, 1);
        assert_eq!(snapshot.swept, 3);
        assert_eq!(snapshot.revealed, 0);
    }

    #[test]
    fn test_thread_safe_counting() {
        use std::thread;

        let metrics = Arc::new(OrchestratorMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.operation_started();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().started, 800);
    }
}
