//! The command-driven operation store.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

use super::state::{clamp_progress, LoadingState};

/// A mutation of the registry. The only way records change.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryCommand {
    /// Insert or replace the record for `state.id`.
    Start(LoadingState),
    /// Remove a record.
    Stop(String),
    /// Set progress (clamped to `[0, 100]`).
    Progress(String, f64),
    /// Set status text.
    Text(String, String),
    /// Set an error and mark the record not loading. The record is kept.
    Error(String, String),
    /// Remove every record.
    Clear,
    /// Remove every record older than `max_age`, regardless of state.
    Sweep { max_age: Duration },
}

impl RegistryCommand {
    fn kind(&self) -> RegistryEventKind {
        match self {
            RegistryCommand::Start(_) => RegistryEventKind::Started,
            RegistryCommand::Stop(_) => RegistryEventKind::Stopped,
            RegistryCommand::Progress(..) => RegistryEventKind::Progress,
            RegistryCommand::Text(..) => RegistryEventKind::Text,
            RegistryCommand::Error(..) => RegistryEventKind::Error,
            RegistryCommand::Clear => RegistryEventKind::Cleared,
            RegistryCommand::Sweep { .. } => RegistryEventKind::Swept,
        }
    }
}

/// Which command produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryEventKind {
    Started,
    Stopped,
    Progress,
    Text,
    Error,
    Cleared,
    Swept,
}

impl fmt::Display for RegistryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistryEventKind::Started => "started",
            RegistryEventKind::Stopped => "stopped",
            RegistryEventKind::Progress => "progress",
            RegistryEventKind::Text => "text",
            RegistryEventKind::Error => "error",
            RegistryEventKind::Cleared => "cleared",
            RegistryEventKind::Swept => "swept",
        };
        f.write_str(name)
    }
}

/// Notification published after a command changed the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEvent {
    /// Command that was applied.
    pub kind: RegistryEventKind,
    /// Ids the command touched.
    pub ids: Vec<String>,
    /// The resulting record, for single-id commands that keep it.
    pub state: Option<LoadingState>,
    /// Whether any record is loading after the command.
    pub global_loading: bool,
}

/// Keyed collection of [`LoadingState`] records.
///
/// Commands are applied one at a time under a lock and each change is
/// published on a broadcast channel while the lock is still held, so
/// subscribers see changes in exactly the order they were applied.
/// Commands naming an unknown id are silent no-ops and publish nothing.
pub struct Registry {
    records: Mutex<HashMap<String, LoadingState>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("records", &self.records.lock().len())
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry whose event channel holds `event_capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `event_capacity` is zero.
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            records: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to registry changes.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Apply one command. Returns the ids it changed (empty for a no-op).
    pub fn apply(&self, command: RegistryCommand) -> Vec<String> {
        let kind = command.kind();
        let mut records = self.records.lock();

        let (ids, state) = match command {
            RegistryCommand::Start(state) => {
                let id = state.id.clone();
                records.insert(id.clone(), state.clone());
                (vec![id], Some(state))
            }
            RegistryCommand::Stop(id) => match records.remove(&id) {
                Some(_) => (vec![id], None),
                None => (Vec::new(), None),
            },
            RegistryCommand::Progress(id, value) => {
                match (records.get_mut(&id), clamp_progress(value)) {
                    (Some(record), Some(progress)) => {
                        record.progress = Some(progress);
                        let state = record.clone();
                        (vec![id], Some(state))
                    }
                    _ => (Vec::new(), None),
                }
            }
            RegistryCommand::Text(id, text) => match records.get_mut(&id) {
                Some(record) => {
                    record.text = Some(text);
                    let state = record.clone();
                    (vec![id], Some(state))
                }
                None => (Vec::new(), None),
            },
            RegistryCommand::Error(id, message) => match records.get_mut(&id) {
                Some(record) => {
                    record.error = Some(message);
                    record.is_loading = false;
                    let state = record.clone();
                    (vec![id], Some(state))
                }
                None => (Vec::new(), None),
            },
            RegistryCommand::Clear => {
                let ids: Vec<String> = records.drain().map(|(id, _)| id).collect();
                (ids, None)
            }
            RegistryCommand::Sweep { max_age } => {
                let now = Instant::now();
                let expired: Vec<String> = records
                    .values()
                    .filter(|r| r.age(now) > max_age)
                    .map(|r| r.id.clone())
                    .collect();
                for id in &expired {
                    records.remove(id);
                }
                if !expired.is_empty() {
                    info!(count = expired.len(), ids = ?expired, "Swept expired loading records");
                }
                (expired, None)
            }
        };

        if ids.is_empty() {
            return ids;
        }

        let global_loading = records.values().any(|r| r.is_loading);
        debug!(kind = %kind, ids = ?ids, global_loading, "Registry command applied");

        // No subscribers is not an error.
        let _ = self.events.send(RegistryEvent {
            kind,
            ids: ids.clone(),
            state,
            global_loading,
        });
        ids
    }

    /// Insert or replace a record.
    pub fn start(&self, state: LoadingState) {
        self.apply(RegistryCommand::Start(state));
    }

    /// Remove a record. Returns whether one existed.
    pub fn stop(&self, id: &str) -> bool {
        !self.apply(RegistryCommand::Stop(id.to_string())).is_empty()
    }

    /// Set a record's progress.
    pub fn set_progress(&self, id: &str, value: f64) {
        self.apply(RegistryCommand::Progress(id.to_string(), value));
    }

    /// Set a record's status text.
    pub fn set_text(&self, id: &str, text: impl Into<String>) {
        self.apply(RegistryCommand::Text(id.to_string(), text.into()));
    }

    /// Mark a record failed.
    pub fn set_error(&self, id: &str, message: impl Into<String>) {
        self.apply(RegistryCommand::Error(id.to_string(), message.into()));
    }

    /// Remove every record. Returns the removed ids.
    pub fn clear(&self) -> Vec<String> {
        self.apply(RegistryCommand::Clear)
    }

    /// Remove records older than `max_age`. Returns the removed ids.
    pub fn sweep(&self, max_age: Duration) -> Vec<String> {
        self.apply(RegistryCommand::Sweep { max_age })
    }

    /// Copy of one record.
    pub fn get(&self, id: &str) -> Option<LoadingState> {
        self.records.lock().get(id).cloned()
    }

    /// Whether a record exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.records.lock().contains_key(id)
    }

    /// Copy of every record, oldest first.
    pub fn snapshot(&self) -> Vec<LoadingState> {
        let mut states: Vec<LoadingState> = self.records.lock().values().cloned().collect();
        states.sort_by(|a, b| (a.start_time, &a.id).cmp(&(b.start_time, &b.id)));
        states
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Whether any record is loading.
    pub fn is_global_loading(&self) -> bool {
        self.records.lock().values().any(|r| r.is_loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{OperationType, Priority, StrategyCalculator};
    use proptest::prelude::*;

    fn state(id: &str) -> LoadingState {
        let strategy = StrategyCalculator::base_strategy(OperationType::Widget);
        LoadingState::new(id, OperationType::Widget, Priority::Medium, strategy)
    }

    #[test]
    fn test_start_inserts_and_replaces() {
        let registry = Registry::new(16);
        registry.start(state("w1"));
        registry.set_progress("w1", 40.0);

        registry.start(state("w1"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("w1").unwrap().progress, None);
    }

    #[test]
    fn test_stop_removes() {
        let registry = Registry::new(16);
        registry.start(state("w1"));
        assert!(registry.stop("w1"));
        assert!(!registry.contains("w1"));
        assert!(!registry.stop("w1"));
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let registry = Registry::new(16);
        let mut rx = registry.subscribe();

        assert!(!registry.stop("ghost"));
        registry.set_progress("ghost", 50.0);
        registry.set_text("ghost", "hello");
        registry.set_error("ghost", "boom");

        assert!(registry.is_empty());
        assert!(rx.try_recv().is_err(), "no-op commands must not publish");
    }

    #[test]
    fn test_error_keeps_record_not_loading() {
        let registry = Registry::new(16);
        registry.start(state("w1"));
        assert!(registry.is_global_loading());

        registry.set_error("w1", "Failed to load");
        let record = registry.get("w1").unwrap();
        assert!(!record.is_loading);
        assert_eq!(record.error.as_deref(), Some("Failed to load"));
        assert!(!registry.is_global_loading());
    }

    #[test]
    fn test_progress_clamps_and_ignores_nan() {
        let registry = Registry::new(16);
        registry.start(state("w1"));

        registry.set_progress("w1", 150.0);
        assert_eq!(registry.get("w1").unwrap().progress, Some(100.0));

        registry.set_progress("w1", f64::NAN);
        assert_eq!(registry.get("w1").unwrap().progress, Some(100.0));

        registry.set_progress("w1", -3.0);
        assert_eq!(registry.get("w1").unwrap().progress, Some(0.0));
    }

    #[test]
    fn test_text_updates() {
        let registry = Registry::new(16);
        registry.start(state("w1"));
        registry.set_text("w1", "Loading stock levels");
        let text = registry.get("w1").unwrap().text;
        assert_eq!(text.as_deref(), Some("Loading stock levels"));
    }

    #[test]
    fn test_clear_returns_ids() {
        let registry = Registry::new(16);
        registry.start(state("a"));
        registry.start(state("b"));

        let mut cleared = registry.clear();
        cleared.sort();
        assert_eq!(cleared, vec!["a".to_string(), "b".to_string()]);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let registry = Registry::new(16);
        registry.start(state("old"));
        tokio::time::advance(Duration::from_secs(200)).await;
        registry.start(state("new"));
        registry.set_error("new", "kept until acknowledged");
        tokio::time::advance(Duration::from_secs(150)).await;

        let swept = registry.sweep(Duration::from_secs(300));
        assert_eq!(swept, vec!["old".to_string()]);
        assert!(registry.contains("new"));
    }

    #[test]
    fn test_events_follow_command_order() {
        let registry = Registry::new(16);
        let mut rx = registry.subscribe();

        registry.start(state("w1"));
        registry.set_progress("w1", 10.0);
        registry.set_error("w1", "boom");
        registry.stop("w1");

        let kinds: Vec<RegistryEventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RegistryEventKind::Started,
                RegistryEventKind::Progress,
                RegistryEventKind::Error,
                RegistryEventKind::Stopped,
            ]
        );
    }

    #[test]
    fn test_event_reports_global_loading() {
        let registry = Registry::new(16);
        let mut rx = registry.subscribe();

        registry.start(state("w1"));
        assert!(rx.try_recv().unwrap().global_loading);

        registry.stop("w1");
        let event = rx.try_recv().unwrap();
        assert!(!event.global_loading);
        assert_eq!(event.ids, vec!["w1".to_string()]);
        assert!(event.state.is_none());
    }

    #[test]
    fn test_snapshot_sorted_by_start_time() {
        let registry = Registry::new(16);
        registry.start(state("b"));
        registry.start(state("a"));
        let ids: Vec<String> = registry.snapshot().into_iter().map(|s| s.id).collect();
        // Same instant without paused time is possible; ties break on id.
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().any(|id| id == "a"));
        assert!(ids.iter().any(|id| id == "b"));
    }

    proptest! {
        /// Stored progress is always within [0, 100].
        #[test]
        fn prop_progress_always_clamped(value in prop::num::f64::ANY) {
            let registry = Registry::new(4);
            registry.start(state("p"));
            registry.set_progress("p", value);
            if let Some(progress) = registry.get("p").unwrap().progress {
                prop_assert!((0.0..=100.0).contains(&progress));
            }
        }

        /// Commands against an unknown id never create a record.
        #[test]
        fn prop_unknown_id_commands_are_noops(id in "[a-z]{1,8}", value in -1e6f64..1e6) {
            let registry = Registry::new(4);
            registry.set_progress(&id, value);
            registry.set_text(&id, "x");
            registry.set_error(&id, "y");
            prop_assert!(!registry.stop(&id));
            prop_assert!(registry.is_empty());
        }
    }
}
