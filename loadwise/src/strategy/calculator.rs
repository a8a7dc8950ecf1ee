//! Strategy resolution.
//!
//! ```text
//! base table[type] ──► × priority multipliers ──► × performance multipliers ──► round ──► overrides
//! ```

use super::types::{EffectiveStrategy, OperationType, Priority, StrategyOverrides};
use crate::performance::PerformanceSnapshot;

/// Multipliers for the four numeric strategy fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Multipliers {
    pub debounce: f64,
    pub timeout: f64,
    pub min_show: f64,
    pub retry: f64,
}

impl Multipliers {
    /// Identity multipliers.
    pub const IDENTITY: Multipliers = Multipliers::new(1.0, 1.0, 1.0, 1.0);

    /// Applied on low-end devices.
    pub const LOW_END_DEVICE: Multipliers = Multipliers::new(1.5, 1.5, 1.2, 0.8);

    /// Applied on slow networks.
    pub const SLOW_NETWORK: Multipliers = Multipliers::new(1.3, 2.0, 1.1, 1.5);

    /// Applied on fast networks.
    pub const FAST_NETWORK: Multipliers = Multipliers::new(0.8, 0.8, 0.9, 1.0);

    pub const fn new(debounce: f64, timeout: f64, min_show: f64, retry: f64) -> Self {
        Self {
            debounce,
            timeout,
            min_show,
            retry,
        }
    }

    /// Multiply field by field.
    pub fn compose(self, other: Multipliers) -> Multipliers {
        Multipliers {
            debounce: self.debounce * other.debounce,
            timeout: self.timeout * other.timeout,
            min_show: self.min_show * other.min_show,
            retry: self.retry * other.retry,
        }
    }

    /// Multipliers for a caller priority.
    pub fn for_priority(priority: Priority) -> Multipliers {
        match priority {
            // Critical work is shown immediately and given twice as long.
            Priority::Critical => Multipliers::new(0.0, 2.0, 0.5, 1.5),
            Priority::High => Multipliers::new(0.5, 1.5, 0.7, 1.2),
            Priority::Medium => Multipliers::IDENTITY,
            Priority::Low => Multipliers::new(2.0, 0.7, 1.5, 0.8),
        }
    }

    /// Multipliers for a performance snapshot.
    ///
    /// Low-end device and slow network compose; a fast network only applies
    /// when the network is not slow.
    pub fn for_snapshot(snapshot: &PerformanceSnapshot) -> Multipliers {
        let mut multipliers = Multipliers::IDENTITY;
        if snapshot.is_low_end_device {
            multipliers = multipliers.compose(Multipliers::LOW_END_DEVICE);
        }
        if snapshot.is_slow_network {
            multipliers = multipliers.compose(Multipliers::SLOW_NETWORK);
        } else if snapshot.is_fast_network() {
            multipliers = multipliers.compose(Multipliers::FAST_NETWORK);
        }
        multipliers
    }
}

/// Resolves an [`EffectiveStrategy`] for an operation.
///
/// Pure and deterministic: identical inputs always produce identical output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyCalculator;

impl StrategyCalculator {
    /// The unscaled strategy for an operation type.
    pub const fn base_strategy(op_type: OperationType) -> EffectiveStrategy {
        const fn base(
            debounce_ms: u64,
            timeout_ms: u64,
            min_show_ms: u64,
            use_skeleton: bool,
            show_progress: bool,
            retry_count: u32,
            performance_aware: bool,
        ) -> EffectiveStrategy {
            EffectiveStrategy {
                debounce_ms,
                timeout_ms,
                min_show_ms,
                use_skeleton,
                show_progress,
                retry_count,
                performance_aware,
            }
        }

        match op_type {
            OperationType::Page => base(0, 30_000, 300, true, true, 2, true),
            OperationType::Component => base(100, 10_000, 200, true, false, 3, true),
            OperationType::Data => base(300, 15_000, 150, false, false, 3, true),
            OperationType::Image => base(50, 20_000, 100, true, false, 2, true),
            OperationType::Api => base(200, 15_000, 100, false, false, 3, true),
            OperationType::Widget => base(150, 12_000, 200, true, false, 2, true),
            OperationType::Background => base(500, 60_000, 0, false, false, 5, false),
        }
    }

    /// Resolve the strategy for an operation.
    ///
    /// The snapshot is only consulted when the strategy is performance-aware
    /// (after applying a `performance_aware` override, if any). Overrides are
    /// applied last and win unconditionally.
    pub fn calculate(
        op_type: OperationType,
        priority: Priority,
        snapshot: Option<&PerformanceSnapshot>,
        overrides: Option<&StrategyOverrides>,
    ) -> EffectiveStrategy {
        let base = Self::base_strategy(op_type);
        let performance_aware = overrides
            .and_then(|o| o.performance_aware)
            .unwrap_or(base.performance_aware);

        let mut multipliers = Multipliers::for_priority(priority);
        if performance_aware {
            if let Some(snapshot) = snapshot {
                multipliers = multipliers.compose(Multipliers::for_snapshot(snapshot));
            }
        }

        let mut strategy = EffectiveStrategy {
            debounce_ms: scale(base.debounce_ms, multipliers.debounce),
            timeout_ms: scale(base.timeout_ms, multipliers.timeout),
            min_show_ms: scale(base.min_show_ms, multipliers.min_show),
            retry_count: scale(base.retry_count as u64, multipliers.retry) as u32,
            ..base
        };

        if let Some(overrides) = overrides {
            overrides.apply(&mut strategy);
        }
        strategy
    }
}

fn scale(value: u64, multiplier: f64) -> u64 {
    (value as f64 * multiplier).round().max(0.0) as u64
}
