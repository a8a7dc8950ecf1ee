//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events. Binaries call
//! [`init_logging`] once, early in `main()`, to install a subscriber that
//! writes to stderr and, optionally, to a log file.
//!
//! # Filter priority (highest to lowest)
//!
//! 1. `LOADWISE_LOG` env var (per-target directives, e.g. `loadwise=debug,warn`)
//! 2. `RUST_LOG` env var
//! 3. [`Verbosity`] derived from CLI flags

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::LoadingError;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "LOADWISE_LOG";

/// Verbosity level derived from CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Only errors.
    Quiet,
    /// Warnings and lifecycle information.
    #[default]
    Normal,
    /// Debug output for every operation transition.
    Verbose,
}

impl Verbosity {
    /// Determine verbosity from `--verbose` / `--quiet` flags. Verbose wins.
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    /// Default level for this verbosity.
    pub const fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Console verbosity.
    pub verbosity: Verbosity,
    /// Optional log file; written through a non-blocking appender.
    pub file: Option<PathBuf>,
    /// Disable ANSI colours on stderr.
    pub no_color: bool,
}

/// Keeps the non-blocking file writer alive.
///
/// Dropping the guard flushes buffered log lines; hold it until exit.
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global tracing subscriber.
///
/// Returns an error if a subscriber is already installed or the log file
/// directory cannot be created.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoadingError> {
    let filter = build_env_filter(config.verbosity);
    let use_ansi = !config.no_color && std::io::IsTerminal::is_terminal(&std::io::stderr());

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_ansi)
        .with_target(config.verbosity == Verbosity::Verbose)
        .with_timer(LocalTime::rfc_3339());

    let (file_layer, file_guard) = match &config.file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&directory)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "loadwise.log".into());

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_timer(LocalTime::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoadingError::Logging(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Build an `EnvFilter`: `LOADWISE_LOG` > `RUST_LOG` > verbosity default.
fn build_env_filter(verbosity: Verbosity) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV_VAR) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::new(verbosity.default_level().as_str().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Verbose);
    }

    #[test]
    fn test_default_levels() {
        assert_eq!(Verbosity::Quiet.default_level(), Level::ERROR);
        assert_eq!(Verbosity::Normal.default_level(), Level::INFO);
        assert_eq!(Verbosity::Verbose.default_level(), Level::DEBUG);
    }
}
