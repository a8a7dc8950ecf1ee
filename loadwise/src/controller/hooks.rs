//! Caller callbacks for timeout, retry and terminal failure.

use std::fmt;
use std::sync::Arc;

/// Called with `(id, attempt)`.
pub type AttemptHook = Arc<dyn Fn(&str, u32) + Send + Sync>;

/// Called with `(id, message)`.
pub type FailureHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Optional per-operation callbacks.
///
/// Hooks run on a runtime worker after the controller has released its
/// locks, so they may call back into the orchestrator. They should not block.
#[derive(Clone, Default)]
pub struct OperationHooks {
    on_timeout: Option<AttemptHook>,
    on_retry: Option<AttemptHook>,
    on_final_failure: Option<FailureHook>,
}

impl fmt::Debug for OperationHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHooks")
            .field("on_timeout", &self.on_timeout.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .field("on_final_failure", &self.on_final_failure.is_some())
            .finish()
    }
}

impl OperationHooks {
    /// No callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called each time the operation times out, with the 1-based attempt
    /// that timed out.
    pub fn on_timeout(mut self, hook: impl Fn(&str, u32) + Send + Sync + 'static) -> Self {
        self.on_timeout = Some(Arc::new(hook));
        self
    }

    /// Called when a retry begins, with the 1-based retry number. This is
    /// where the caller re-issues the work being timed.
    pub fn on_retry(mut self, hook: impl Fn(&str, u32) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(hook));
        self
    }

    /// Called once when the retry budget is exhausted.
    pub fn on_final_failure(mut self, hook: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_final_failure = Some(Arc::new(hook));
        self
    }

    pub(crate) fn timeout_call(&self, id: &str, attempt: u32) -> Option<HookCall> {
        self.on_timeout
            .clone()
            .map(|hook| HookCall::Attempt(hook, id.to_string(), attempt))
    }

    pub(crate) fn retry_call(&self, id: &str, attempt: u32) -> Option<HookCall> {
        self.on_retry
            .clone()
            .map(|hook| HookCall::Attempt(hook, id.to_string(), attempt))
    }

    pub(crate) fn failure_call(&self, id: &str, message: &str) -> Option<HookCall> {
        let hook = self.on_final_failure.clone()?;
        Some(HookCall::Failure(hook, id.to_string(), message.to_string()))
    }
}

/// A hook invocation captured under lock and run after release.
pub(crate) enum HookCall {
    Attempt(AttemptHook, String, u32),
    Failure(FailureHook, String, String),
}

impl HookCall {
    pub(crate) fn invoke(self) {
        match self {
            HookCall::Attempt(hook, id, attempt) => hook(&id, attempt),
            HookCall::Failure(hook, id, message) => hook(&id, &message),
        }
    }
}
