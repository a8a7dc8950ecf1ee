//! Loadwise - adaptive loading orchestration
//!
//! This library tracks many concurrently in-flight loading operations (page
//! loads, widget fetches, API calls, image loads) and decides when each one
//! becomes visible, how long to wait before declaring it failed, and whether
//! and how aggressively to retry it. Decisions combine the operation type,
//! a caller-assigned priority and live measurements of network and device
//! performance.
//!
//! # Architecture
//!
//! ```text
//!  HostProbe ──► PerformanceSampler ──► StrategyCalculator
//!                   (TTL cache)            (pure function)
//!                                                │
//!  caller ──► LoadingOrchestrator ──► TimerController ──► Registry ──► subscribers
//!             (façade, batch, guard)  (debounce, timeout,  (keyed map,
//!                                      retry, min-show)     broadcast events)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use loadwise::{LoadingOrchestrator, OperationType, OrchestratorConfig, Priority, SystemProbe};
//! use std::sync::Arc;
//!
//! let orchestrator = LoadingOrchestrator::init(
//!     OrchestratorConfig::default(),
//!     Arc::new(SystemProbe::new()),
//! )?;
//!
//! orchestrator.start("stock-table", OperationType::Widget, Priority::Medium);
//! // ... fetch the widget data ...
//! orchestrator.stop("stock-table");
//!
//! orchestrator.dispose();
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod performance;
pub mod registry;
pub mod strategy;
pub mod telemetry;

pub use config::{ConfigError, OrchestratorConfig};
pub use controller::{OperationHooks, OperationPhase, OperationStatus, RetrySettings};
pub use error::LoadingError;
pub use orchestrator::{
    BatchError, BatchLoading, LoadingGuard, LoadingOrchestrator, NetworkChange, StartOptions,
};
pub use performance::{
    DeviceInfo, HostProbe, LoadClass, NetworkInfo, NetworkType, PerformanceSampler,
    PerformanceSnapshot, ProbeError, StaticProbe, SystemProbe, UnavailableProbe,
};
pub use registry::{LoadingState, Registry, RegistryCommand, RegistryEvent, RegistryEventKind};
pub use strategy::{
    EffectiveStrategy, OperationType, Priority, StrategyCalculator, StrategyOverrides,
};
pub use telemetry::{MetricsSnapshot, OrchestratorMetrics};
