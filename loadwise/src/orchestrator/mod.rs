//! The caller-facing orchestrator.
//!
//! [`LoadingOrchestrator`] is the composition root: it owns the sampler,
//! registry and timer controller for one application lifetime, between
//! `init` and `dispose`. [`BatchLoading`] aggregates a set of ids and
//! [`LoadingGuard`] ties an operation to a scope.

mod batch;
mod facade;
mod guard;
mod monitor;

pub use batch::{BatchError, BatchLoading};
pub use facade::{LoadingOrchestrator, StartOptions};
pub use guard::LoadingGuard;
pub use monitor::NetworkChange;
