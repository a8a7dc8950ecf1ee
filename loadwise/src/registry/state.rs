//! Per-operation loading records.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::strategy::{EffectiveStrategy, OperationType, Priority};

/// One active (or failed, awaiting acknowledgement) operation.
///
/// A record exists in the registry while its operation is loading or holds an
/// unacknowledged error. The strategy is frozen when the record is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadingState {
    /// Caller-chosen unique key.
    pub id: String,
    /// Whether the operation is still in flight.
    pub is_loading: bool,
    /// Progress in `[0, 100]`, if reported.
    pub progress: Option<f64>,
    /// Status text, if any.
    pub text: Option<String>,
    /// Terminal error awaiting acknowledgement.
    pub error: Option<String>,
    /// Kind of work.
    pub operation_type: OperationType,
    /// Caller-assigned priority.
    pub priority: Priority,
    /// When the operation was accepted (before debounce).
    #[serde(skip)]
    pub start_time: Instant,
    /// Caller's duration hint, for display only.
    pub estimated_duration: Option<Duration>,
    /// Strategy bound at start.
    pub strategy: EffectiveStrategy,
    /// Version of the performance snapshot the strategy was derived from.
    pub snapshot_version: Option<u64>,
}

impl LoadingState {
    /// Create a loading record starting now.
    pub fn new(
        id: impl Into<String>,
        operation_type: OperationType,
        priority: Priority,
        strategy: EffectiveStrategy,
    ) -> Self {
        Self {
            id: id.into(),
            is_loading: true,
            progress: None,
            text: None,
            error: None,
            operation_type,
            priority,
            start_time: Instant::now(),
            estimated_duration: None,
            strategy,
            snapshot_version: None,
        }
    }

    /// Set the status text.
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text;
        self
    }

    /// Set the duration hint.
    pub fn with_estimated_duration(mut self, estimate: Option<Duration>) -> Self {
        self.estimated_duration = estimate;
        self
    }

    /// Record which snapshot the strategy came from.
    pub fn with_snapshot_version(mut self, version: Option<u64>) -> Self {
        self.snapshot_version = version;
        self
    }

    /// Time since the operation was accepted.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start_time)
    }

    /// Whether the record holds an error.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Clamp a progress value into `[0, 100]`. NaN has no meaningful position
/// and yields `None`.
pub fn clamp_progress(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(0.0, 100.0))
    }
}
