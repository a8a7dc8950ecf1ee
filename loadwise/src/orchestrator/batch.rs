//! Group operations over a fixed set of ids.

use serde::Serialize;

use super::facade::LoadingOrchestrator;
use crate::strategy::{EffectiveStrategy, OperationType, Priority};

/// An error reported by one member of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub id: String,
    pub message: String,
}

/// Aggregate view and control over a set of operation ids.
///
/// Queries read the registry at call time; ids still debouncing count as
/// not loading.
#[derive(Debug, Clone)]
pub struct BatchLoading {
    orchestrator: LoadingOrchestrator,
    ids: Vec<String>,
}

impl BatchLoading {
    pub(crate) fn new(orchestrator: LoadingOrchestrator, ids: Vec<String>) -> Self {
        Self { orchestrator, ids }
    }

    /// Member ids, in the order given.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Whether any member is loading.
    pub fn is_any_loading(&self) -> bool {
        self.ids.iter().any(|id| self.member_loading(id))
    }

    /// Whether every member is loading. `false` for an empty batch.
    pub fn is_all_loading(&self) -> bool {
        !self.ids.is_empty() && self.ids.iter().all(|id| self.member_loading(id))
    }

    /// Mean of the progress values that have been reported, or `None` when
    /// no member reported any.
    pub fn average_progress(&self) -> Option<f64> {
        let values: Vec<f64> = self
            .ids
            .iter()
            .filter_map(|id| self.orchestrator.state(id).and_then(|s| s.progress))
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// Start every member with the same type and priority.
    pub fn start_all(&self, op_type: OperationType, priority: Priority) -> Vec<EffectiveStrategy> {
        self.ids
            .iter()
            .map(|id| self.orchestrator.start(id.clone(), op_type, priority))
            .collect()
    }

    /// Stop every member. Returns how many were running.
    pub fn stop_all(&self) -> usize {
        self.ids
            .iter()
            .filter(|id| self.orchestrator.stop(id))
            .count()
    }

    /// Errors currently set on members.
    pub fn errors(&self) -> Vec<BatchError> {
        self.ids
            .iter()
            .filter_map(|id| {
                let message = self.orchestrator.state(id)?.error?;
                Some(BatchError { id: id.clone(), message })
            })
            .collect()
    }

    fn member_loading(&self, id: &str) -> bool {
        self.orchestrator.state(id).is_some_and(|s| s.is_loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use crate::performance::UnavailableProbe;
    use std::sync::Arc;
    use std::time::Duration;

    fn orchestrator() -> LoadingOrchestrator {
        let config = OrchestratorConfig::default()
            .with_auto_cleanup(false)
            .with_network_monitoring(false);
        LoadingOrchestrator::init(config, Arc::new(UnavailableProbe)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch() {
        let batch = orchestrator().batch(Vec::<String>::new());
        assert!(!batch.is_any_loading());
        assert!(!batch.is_all_loading());
        assert_eq!(batch.average_progress(), None);
        assert!(batch.errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_flags() {
        let orchestrator = orchestrator();
        let batch = orchestrator.batch(["p1", "p2"]);
        orchestrator.start("p1", OperationType::Page, Priority::Medium);

        assert!(batch.is_any_loading());
        assert!(!batch.is_all_loading());

        orchestrator.start("p2", OperationType::Page, Priority::Medium);
        assert!(batch.is_all_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_average_progress_ignores_unreported() {
        let orchestrator = orchestrator();
        let batch = orchestrator.batch(["p1", "p2", "p3"]);
        batch.start_all(OperationType::Page, Priority::Medium);
        assert_eq!(batch.average_progress(), None);

        orchestrator.update_progress("p1", 20.0);
        orchestrator.update_progress("p3", 60.0);
        assert_eq!(batch.average_progress(), Some(40.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_and_stop_all() {
        let orchestrator = orchestrator();
        let batch = orchestrator.batch(["p1", "p2"]);
        batch.start_all(OperationType::Page, Priority::Medium);
        orchestrator.set_error("p2", "Failed to load");

        assert_eq!(
            batch.errors(),
            vec![BatchError {
                id: "p2".to_string(),
                message: "Failed to load".to_string()
            }]
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(batch.stop_all(), 2);
        assert!(orchestrator.states().is_empty());
    }
}
