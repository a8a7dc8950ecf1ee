//! Timer and retry control.
//!
//! The [`TimerController`] owns one state machine per operation id and turns
//! caller calls plus timer fires into registry commands:
//!
//! - **Debounce**: an operation only reaches the registry once its debounce
//!   delay has passed. Stopping it earlier leaves no trace.
//! - **Timeout**: a visible operation that is not stopped within its timeout
//!   is retried after a backoff delay ([`RetrySettings`]) until its retry
//!   budget runs out, then marked failed.
//! - **Minimum show time**: a visible operation stays visible at least
//!   `min_show_time` even when it finishes sooner.
//!
//! Timeouts and retries never surface to the caller except through
//! [`OperationHooks`] and the final error on the registry record.

mod hooks;
mod retry;
mod status;
mod timer;

pub use hooks::{AttemptHook, FailureHook, OperationHooks};
pub use retry::RetrySettings;
pub use status::{OperationPhase, OperationStatus};
pub use timer::TimerController;
