//! Orchestrator telemetry for observability.
//!
//! Lock-free atomic counters record every lifecycle event the orchestrator
//! drives. A point-in-time [`MetricsSnapshot`] is taken for display.
//!
//! # Architecture
//!
//! ```text
//! TimerController ─────► OrchestratorMetrics ─────► MetricsSnapshot ─────► Views
//! Registry sweep         (atomic counters)          (point-in-time copy)   (CLI, logs)
//! ```
//!
//! # Example
//!
//! ```
//! use loadwise::telemetry::OrchestratorMetrics;
//!
//! let metrics = OrchestratorMetrics::new();
//! metrics.operation_started();
//! metrics.operation_revealed();
//! metrics.operation_completed();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.completed, 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::OrchestratorMetrics;
pub use snapshot::MetricsSnapshot;
