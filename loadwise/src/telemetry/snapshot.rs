//! Point-in-time metrics copy.

use std::fmt;

use serde::Serialize;

/// A copy of [`super::OrchestratorMetrics`] taken at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Operations accepted by `start`.
    pub started: u64,
    /// Operations that became visible.
    pub revealed: u64,
    /// Operations stopped inside their debounce window (never shown).
    pub suppressed: u64,
    /// Visible operations removed after success.
    pub completed: u64,
    /// Operations torn down by `cancel`, `clear_all` or a restart of their id.
    pub cancelled: u64,
    /// Timeout timers that fired.
    pub timeouts: u64,
    /// Retries scheduled.
    pub retries: u64,
    /// Operations marked failed, by retry exhaustion or a caller error.
    pub failures: u64,
    /// Records removed by the leak-guard sweep.
    pub swept: u64,
}

impl MetricsSnapshot {
    /// Fraction of started operations that never had to be shown.
    ///
    /// Returns `None` before any operation has started.
    pub fn suppression_rate(&self) -> Option<f64> {
        if self.started == 0 {
            None
        } else {
            Some(self.suppressed as f64 / self.started as f64)
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "started={} revealed={} suppressed={} completed={} cancelled={} ",
            self.started, self.revealed, self.suppressed, self.completed, self.cancelled
        )?;
        write!(
            f,
            "timeouts={} retries={} failures={} swept={}",
            self.timeouts, self.retries, self.failures, self.swept
        )
    }
}
