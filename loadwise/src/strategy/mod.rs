//! Strategy calculation.
//!
//! Maps `(operation type, priority, performance snapshot, overrides)` to the
//! [`EffectiveStrategy`] that governs one operation: how long to debounce its
//! reveal, how long to wait before it times out, how long it stays visible at
//! minimum and how many times it may be retried.
//!
//! # Example
//!
//! ```
//! use loadwise::strategy::{OperationType, Priority, StrategyCalculator};
//!
//! let strategy = StrategyCalculator::calculate(OperationType::Widget, Priority::Medium, None, None);
//! assert_eq!(strategy.debounce_ms, 150);
//! assert_eq!(strategy.timeout_ms, 12_000);
//! ```

mod calculator;
mod types;

pub use calculator::{Multipliers, StrategyCalculator};
pub use types::{EffectiveStrategy, OperationType, Priority, StrategyOverrides};
