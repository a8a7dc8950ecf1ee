//! Retry budget and backoff settings.

use std::time::Duration;

use crate::config::{DEFAULT_MAX_RETRY_DELAY_MS, DEFAULT_RETRY_DELAY_MS};
use crate::strategy::EffectiveStrategy;

/// How an operation retries after a timeout.
///
/// The retry budget normally comes from the operation's
/// [`EffectiveStrategy::retry_count`]; `retry_count` replaces it for a single
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Replaces the strategy's retry budget when set.
    pub retry_count: Option<u32>,
    /// Base delay before the first retry.
    pub retry_delay: Duration,
    /// Double the delay after every retry.
    pub exponential_backoff: bool,
    /// Cap on any single delay.
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            retry_count: None,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            exponential_backoff: true,
            max_delay: Duration::from_millis(DEFAULT_MAX_RETRY_DELAY_MS),
        }
    }
}

impl RetrySettings {
    /// Default settings: 1s base delay, exponential, 30s cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constant delay between retries.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            retry_delay: delay,
            exponential_backoff: false,
            ..Self::default()
        }
    }

    /// Replace the strategy's retry budget.
    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Set the base delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Enable or disable exponential backoff.
    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    /// Set the delay cap.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Retries allowed for an operation bound to `strategy`.
    pub fn budget(&self, strategy: &EffectiveStrategy) -> u32 {
        self.retry_count.unwrap_or(strategy.retry_count)
    }

    /// Delay before a retry.
    ///
    /// # Arguments
    ///
    /// * `retry` - Zero-based retry index (0 is the first retry)
    ///
    /// With backoff the delay is `retry_delay * 2^retry`, capped at
    /// `max_delay`. Without backoff it is always `retry_delay`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if !self.exponential_backoff {
            return self.retry_delay;
        }
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.retry_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
