//! Operation lifecycle phases.

use std::fmt;

use serde::Serialize;

/// Where an operation is in its lifecycle.
///
/// ```text
/// start ──► Debouncing ──► Visible ──► (RetryPending ──► Visible)* ──► Stopping ──► removed
///               │             │                                    └──► Failed ──► removed
///               └─ stop ──► removed (never shown)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationPhase {
    /// Waiting out the debounce window; no registry record yet.
    Debouncing,
    /// Shown in the registry with a timeout armed (if any).
    Visible,
    /// Timed out and waiting for the backoff delay before retrying.
    RetryPending,
    /// Completed, held visible until the minimum show time has elapsed.
    Stopping,
    /// Terminal error set; waits for the caller to stop or retry.
    Failed,
}

impl OperationPhase {
    /// Whether the operation has a registry record.
    pub fn is_visible(&self) -> bool {
        !matches!(self, OperationPhase::Debouncing)
    }

    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationPhase::Debouncing => "debouncing",
            OperationPhase::Visible => "visible",
            OperationPhase::RetryPending => "retry_pending",
            OperationPhase::Stopping => "stopping",
            OperationPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for OperationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one operation's controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationStatus {
    /// Current phase.
    pub phase: OperationPhase,
    /// Retries started so far.
    pub attempt: u32,
    /// Timeouts fired so far.
    pub timeouts: u32,
    /// Set from a timeout firing until the next retry re-arms the operation.
    pub is_timed_out: bool,
    /// Retries allowed in total.
    pub retry_budget: u32,
}

impl OperationStatus {
    /// Whether a manual retry is still allowed.
    pub fn can_retry(&self) -> bool {
        match self.phase {
            OperationPhase::RetryPending => true,
            OperationPhase::Visible | OperationPhase::Failed => self.attempt < self.retry_budget,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(phase: OperationPhase, attempt: u32, budget: u32) -> OperationStatus {
        OperationStatus {
            phase,
            attempt,
            timeouts: 0,
            is_timed_out: false,
            retry_budget: budget,
        }
    }

    #[test]
    fn test_visibility() {
        assert!(!OperationPhase::Debouncing.is_visible());
        assert!(OperationPhase::Visible.is_visible());
        assert!(OperationPhase::Failed.is_visible());
    }

    #[test]
    fn test_can_retry() {
        assert!(status(OperationPhase::Failed, 1, 2).can_retry());
        assert!(!status(OperationPhase::Failed, 2, 2).can_retry());
        assert!(status(OperationPhase::RetryPending, 2, 2).can_retry());
        assert!(!status(OperationPhase::Debouncing, 0, 3).can_retry());
        assert!(!status(OperationPhase::Stopping, 0, 3).can_retry());
    }
}
