//! Operation classification and resolved strategy types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What kind of work an operation represents.
///
/// The type selects the base strategy; see
/// [`super::StrategyCalculator::base_strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Full page load.
    Page,
    /// UI component load.
    Component,
    /// Data query.
    Data,
    /// Image load.
    Image,
    /// API call.
    Api,
    /// Dashboard widget fetch.
    Widget,
    /// Background work the user is not waiting on.
    Background,
}

impl OperationType {
    /// All operation types, in table order.
    pub const ALL: [OperationType; 7] = [
        OperationType::Page,
        OperationType::Component,
        OperationType::Data,
        OperationType::Image,
        OperationType::Api,
        OperationType::Widget,
        OperationType::Background,
    ];

    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Page => "page",
            OperationType::Component => "component",
            OperationType::Data => "data",
            OperationType::Image => "image",
            OperationType::Api => "api",
            OperationType::Widget => "widget",
            OperationType::Background => "background",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown operation type: {s}"))
    }
}

/// Caller-assigned urgency.
///
/// Ordered `Low < Medium < High < Critical`. Higher priorities reveal sooner
/// and wait longer before timing out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// All priorities, lowest first.
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown priority: {s}"))
    }
}

/// The resolved timing and behaviour parameters of one operation.
///
/// Derived once when the operation starts and never recomputed while it
/// runs. Durations are stored as whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectiveStrategy {
    /// Delay before the operation may become visible.
    pub debounce_ms: u64,
    /// Time after reveal before the operation counts as timed out (0 = never).
    pub timeout_ms: u64,
    /// Minimum time a visible operation stays visible.
    pub min_show_ms: u64,
    /// Render a skeleton placeholder.
    pub use_skeleton: bool,
    /// Render determinate progress.
    pub show_progress: bool,
    /// Retries allowed after the first timeout.
    pub retry_count: u32,
    /// Whether performance snapshots scale this strategy.
    pub performance_aware: bool,
}

impl EffectiveStrategy {
    /// Debounce as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Minimum visible time as a `Duration`.
    pub fn min_show_time(&self) -> Duration {
        Duration::from_millis(self.min_show_ms)
    }
}

impl fmt::Display for EffectiveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "debounce={}ms timeout={}ms min_show={}ms retries={} ",
            self.debounce_ms, self.timeout_ms, self.min_show_ms, self.retry_count
        )?;
        write!(
            f,
            "skeleton={} progress={} adaptive={}",
            self.use_skeleton, self.show_progress, self.performance_aware
        )
    }
}

/// Caller overrides; any field that is set wins outright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyOverrides {
    pub debounce_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub min_show_ms: Option<u64>,
    pub use_skeleton: Option<bool>,
    pub show_progress: Option<bool>,
    pub retry_count: Option<u32>,
    pub performance_aware: Option<bool>,
}

impl StrategyOverrides {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the debounce.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = Some(debounce.as_millis() as u64);
        self
    }

    /// Override the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Override the minimum visible time.
    pub fn min_show_time(mut self, min_show: Duration) -> Self {
        self.min_show_ms = Some(min_show.as_millis() as u64);
        self
    }

    /// Override the skeleton flag.
    pub fn use_skeleton(mut self, enabled: bool) -> Self {
        self.use_skeleton = Some(enabled);
        self
    }

    /// Override the progress flag.
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.show_progress = Some(enabled);
        self
    }

    /// Override the retry count.
    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Override performance awareness.
    pub fn performance_aware(mut self, enabled: bool) -> Self {
        self.performance_aware = Some(enabled);
        self
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every set field to `strategy`.
    pub fn apply(&self, strategy: &mut EffectiveStrategy) {
        if let Some(v) = self.debounce_ms {
            strategy.debounce_ms = v;
        }
        if let Some(v) = self.timeout_ms {
            strategy.timeout_ms = v;
        }
        if let Some(v) = self.min_show_ms {
            strategy.min_show_ms = v;
        }
        if let Some(v) = self.use_skeleton {
            strategy.use_skeleton = v;
        }
        if let Some(v) = self.show_progress {
            strategy.show_progress = v;
        }
        if let Some(v) = self.retry_count {
            strategy.retry_count = v;
        }
        if let Some(v) = self.performance_aware {
            strategy.performance_aware = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_round_trips_names() {
        for op in OperationType::ALL {
            assert_eq!(op.as_str().parse::<OperationType>().unwrap(), op);
        }
        assert_eq!(
            "WIDGET".parse::<OperationType>().unwrap(),
            OperationType::Widget
        );
        assert!("video".parse::<OperationType>().is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_serde_names_are_lowercase() {
        let api = serde_json::to_string(&OperationType::Api).unwrap();
        assert_eq!(api, "\"api\"");
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
    }

    #[test]
    fn test_overrides_apply_only_set_fields() {
        let mut strategy = EffectiveStrategy {
            debounce_ms: 100,
            timeout_ms: 1000,
            min_show_ms: 50,
            use_skeleton: true,
            show_progress: false,
            retry_count: 2,
            performance_aware: true,
        };
        StrategyOverrides::new()
            .timeout(Duration::from_secs(5))
            .retry_count(0)
            .apply(&mut strategy);

        assert_eq!(strategy.timeout_ms, 5000);
        assert_eq!(strategy.retry_count, 0);
        assert_eq!(strategy.debounce_ms, 100);
        assert!(strategy.use_skeleton);
    }

    #[test]
    fn test_overrides_is_empty() {
        assert!(StrategyOverrides::new().is_empty());
        assert!(!StrategyOverrides::new().show_progress(true).is_empty());
    }

    #[test]
    fn test_strategy_duration_accessors() {
        let strategy = EffectiveStrategy {
            debounce_ms: 150,
            timeout_ms: 12_000,
            min_show_ms: 200,
            use_skeleton: true,
            show_progress: false,
            retry_count: 2,
            performance_aware: true,
        };
        assert_eq!(strategy.debounce(), Duration::from_millis(150));
        assert_eq!(strategy.timeout(), Duration::from_secs(12));
        assert_eq!(strategy.min_show_time(), Duration::from_millis(200));
    }
}
