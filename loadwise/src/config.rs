//! Orchestrator configuration.
//!
//! `OrchestratorConfig` is the single configuration surface for the
//! orchestrator. Every option has a documented default, a builder method and,
//! where the value is a duration, a `Duration` accessor. Configuration can
//! also be loaded from an INI file:
//!
//! ```ini
//! [orchestrator]
//! performance_aware = true
//! network_monitoring = true
//! auto_cleanup = true
//! cleanup_interval_ms = 60000
//! max_operation_age_secs = 300
//! event_capacity = 256
//!
//! [sampler]
//! snapshot_ttl_secs = 30
//!
//! [retry]
//! retry_delay_ms = 1000
//! exponential_backoff = true
//! max_delay_ms = 30000
//! ```
//!
//! Unknown sections and keys are ignored so the same file can carry settings
//! for other components.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use serde::Serialize;
use thiserror::Error;

use crate::controller::RetrySettings;

// =============================================================================
// Defaults
// =============================================================================

/// Default interval between leak-guard sweeps (60 seconds).
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 60_000;

/// Default hard ceiling on an operation's age before a sweep removes it (5 minutes).
pub const DEFAULT_MAX_OPERATION_AGE_SECS: u64 = 300;

/// Default capacity of the registry event broadcast channel.
///
/// Slow subscribers that fall further behind than this see a `Lagged` error
/// and should re-read the registry snapshot.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default time-to-live of a cached performance snapshot (30 seconds).
pub const DEFAULT_SNAPSHOT_TTL_SECS: u64 = 30;

/// Default base delay between retries (1 second).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Default cap on a single backoff delay (30 seconds).
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 30_000;

const SECTION_ORCHESTRATOR: &str = "orchestrator";
const SECTION_SAMPLER: &str = "sampler";
const SECTION_RETRY: &str = "retry";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid INI.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] ini::ParseError),

    /// A key holds a value that cannot be interpreted.
    #[error("Invalid value '{value}' for key '{key}'")]
    InvalidValue { key: String, value: String },

    /// A value parsed but is outside its permitted range.
    #[error("Value out of range for key '{key}': {reason}")]
    OutOfRange { key: String, reason: String },
}

/// Configuration for the loading orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestratorConfig {
    // ==================== Behaviour ====================
    /// Scale strategies by the current performance snapshot.
    ///
    /// Default: true.
    pub performance_aware: bool,

    /// Listen for host network-change events and re-sample on each one.
    ///
    /// Default: true.
    pub network_monitoring: bool,

    /// Run the periodic leak-guard sweep.
    ///
    /// Default: true.
    pub auto_cleanup: bool,

    // ==================== Cleanup ====================
    /// Interval between sweeps in milliseconds. Default: 60000.
    pub cleanup_interval_ms: u64,

    /// Age after which a sweep removes a record regardless of state.
    /// Default: 300 seconds.
    pub max_operation_age_secs: u64,

    /// Capacity of the registry event channel. Default: 256.
    pub event_capacity: usize,

    // ==================== Sampling ====================
    /// How long a performance snapshot is served from cache. Default: 30s.
    pub snapshot_ttl_secs: u64,

    // ==================== Retry ====================
    /// Base delay between retries in milliseconds. Default: 1000.
    pub retry_delay_ms: u64,

    /// Double the delay after every retry. Default: true.
    pub exponential_backoff: bool,

    /// Cap on a single backoff delay in milliseconds. Default: 30000.
    pub max_retry_delay_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            performance_aware: true,
            network_monitoring: true,
            auto_cleanup: true,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            max_operation_age_secs: DEFAULT_MAX_OPERATION_AGE_SECS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            snapshot_ttl_secs: DEFAULT_SNAPSHOT_TTL_SECS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            exponential_backoff: true,
            max_retry_delay_ms: DEFAULT_MAX_RETRY_DELAY_MS,
        }
    }
}

impl OrchestratorConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from an INI file.
    ///
    /// Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_ini_str(&contents)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents)?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(SECTION_ORCHESTRATOR)) {
            read_bool(section, "performance_aware", &mut config.performance_aware)?;
            read_bool(
                section,
                "network_monitoring",
                &mut config.network_monitoring,
            )?;
            read_bool(section, "auto_cleanup", &mut config.auto_cleanup)?;
            read_value(
                section,
                "cleanup_interval_ms",
                &mut config.cleanup_interval_ms,
            )?;
            read_value(
                section,
                "max_operation_age_secs",
                &mut config.max_operation_age_secs,
            )?;
            read_value(section, "event_capacity", &mut config.event_capacity)?;
        }

        if let Some(section) = ini.section(Some(SECTION_SAMPLER)) {
            read_value(section, "snapshot_ttl_secs", &mut config.snapshot_ttl_secs)?;
        }

        if let Some(section) = ini.section(Some(SECTION_RETRY)) {
            read_value(section, "retry_delay_ms", &mut config.retry_delay_ms)?;
            read_bool(
                section,
                "exponential_backoff",
                &mut config.exponential_backoff,
            )?;
            read_value(section, "max_delay_ms", &mut config.max_retry_delay_ms)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as INI text (the inverse of `from_ini_str`).
    pub fn to_ini_string(&self) -> String {
        let max_age = self.max_operation_age_secs.to_string();
        let mut ini = Ini::new();
        ini.with_section(Some(SECTION_ORCHESTRATOR))
            .set("performance_aware", self.performance_aware.to_string())
            .set("network_monitoring", self.network_monitoring.to_string())
            .set("auto_cleanup", self.auto_cleanup.to_string())
            .set("cleanup_interval_ms", self.cleanup_interval_ms.to_string())
            .set("max_operation_age_secs", max_age)
            .set("event_capacity", self.event_capacity.to_string());
        ini.with_section(Some(SECTION_SAMPLER))
            .set("snapshot_ttl_secs", self.snapshot_ttl_secs.to_string());
        ini.with_section(Some(SECTION_RETRY))
            .set("retry_delay_ms", self.retry_delay_ms.to_string())
            .set("exponential_backoff", self.exponential_backoff.to_string())
            .set("max_delay_ms", self.max_retry_delay_ms.to_string());

        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = ini.write_to(&mut out);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Check value ranges that would otherwise panic or spin at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cleanup_interval_ms == 0 {
            return Err(ConfigError::OutOfRange {
                key: "cleanup_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                key: "event_capacity".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_retry_delay_ms < self.retry_delay_ms {
            return Err(ConfigError::OutOfRange {
                key: "max_delay_ms".to_string(),
                reason: "must be at least retry_delay_ms".to_string(),
            });
        }
        Ok(())
    }

    /// Interval between sweeps.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Age after which a sweep removes a record.
    pub fn max_operation_age(&self) -> Duration {
        Duration::from_secs(self.max_operation_age_secs)
    }

    /// Snapshot cache time-to-live.
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    /// Default retry settings for operations that do not supply their own.
    pub fn retry_settings(&self) -> RetrySettings {
        RetrySettings {
            retry_count: None,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            exponential_backoff: self.exponential_backoff,
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
        }
    }

    /// Enable or disable performance-aware strategies.
    pub fn with_performance_aware(mut self, enabled: bool) -> Self {
        self.performance_aware = enabled;
        self
    }

    /// Enable or disable network-change monitoring.
    pub fn with_network_monitoring(mut self, enabled: bool) -> Self {
        self.network_monitoring = enabled;
        self
    }

    /// Enable or disable the periodic sweep.
    pub fn with_auto_cleanup(mut self, enabled: bool) -> Self {
        self.auto_cleanup = enabled;
        self
    }

    /// Set the sweep interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the maximum operation age.
    pub fn with_max_operation_age(mut self, age: Duration) -> Self {
        self.max_operation_age_secs = age.as_secs();
        self
    }

    /// Set the snapshot cache time-to-live.
    pub fn with_snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl_secs = ttl.as_secs();
        self
    }

    /// Set the base retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Enable or disable exponential backoff.
    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }
}

fn read_value<T: FromStr>(
    section: &Properties,
    key: &str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = section.get(key) {
        let raw = raw.trim();
        *target = raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        })?;
    }
    Ok(())
}

fn read_bool(section: &Properties, key: &str, target: &mut bool) -> Result<(), ConfigError> {
    if let Some(raw) = section.get(key) {
        *target = match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => true,
            "false" | "no" | "off" | "0" => false,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                })
            }
        };
    }
    Ok(())
}
