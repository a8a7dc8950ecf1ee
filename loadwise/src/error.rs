//! Library error types.
//!
//! Orchestrator commands never fail: unknown ids and late calls are silent
//! no-ops. The errors here cover setup concerns only (runtime, config,
//! logging).

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while setting up or tearing down the orchestrator.
#[derive(Debug, Error)]
pub enum LoadingError {
    /// `LoadingOrchestrator::init` was called outside a Tokio runtime.
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),

    /// Configuration could not be loaded or was invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// I/O error (log directory creation etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_runtime_display() {
        let err = LoadingError::NoRuntime("not inside a runtime".to_string());
        assert!(err.to_string().contains("No Tokio runtime"));
        assert!(err.to_string().contains("not inside a runtime"));
    }

    #[test]
    fn test_from_config_error() {
        let err: LoadingError = ConfigError::InvalidValue {
            key: "retry_delay_ms".to_string(),
            value: "soon".to_string(),
        }
        .into();
        assert!(matches!(err, LoadingError::Config(_)));
        assert!(err.to_string().contains("retry_delay_ms"));
    }
}
