//! Scope-bound operations.

use super::facade::LoadingOrchestrator;
use crate::strategy::EffectiveStrategy;

/// Stops its operation when dropped.
///
/// Use it to pair every `start` with a `stop` on all exit paths, including
/// early returns and `?`.
///
/// ```ignore
/// let guard = orchestrator.guard("report", OperationType::Data, Priority::High);
/// let rows = fetch_report().await?; // an error drops the guard and stops the operation
/// guard.complete();
/// ```
#[must_use = "dropping the guard stops the operation immediately"]
#[derive(Debug)]
pub struct LoadingGuard {
    orchestrator: LoadingOrchestrator,
    id: String,
    strategy: EffectiveStrategy,
    armed: bool,
}

impl LoadingGuard {
    pub(crate) fn new(
        orchestrator: LoadingOrchestrator,
        id: String,
        strategy: EffectiveStrategy,
    ) -> Self {
        Self {
            orchestrator,
            id,
            strategy,
            armed: true,
        }
    }

    /// Operation id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Strategy bound at start.
    pub fn strategy(&self) -> &EffectiveStrategy {
        &self.strategy
    }

    /// Report progress.
    pub fn set_progress(&self, value: f64) {
        self.orchestrator.update_progress(&self.id, value);
    }

    /// Replace the status text.
    pub fn set_text(&self, text: &str) {
        self.orchestrator.update_text(&self.id, text);
    }

    /// Stop the operation now.
    pub fn complete(mut self) {
        self.armed = false;
        self.orchestrator.stop(&self.id);
    }

    /// Leave the operation failed with `message`; the caller stops it later.
    pub fn fail(mut self, message: &str) {
        self.armed = false;
        self.orchestrator.set_error(&self.id, message);
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.armed {
            self.orchestrator.stop(&self.id);
        }
    }
}
