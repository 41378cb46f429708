//! Logging setup for the CLI
//!
//! Diagnostics go to stderr so `--json` output on stdout stays parseable.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Overrides the verbosity flags (`info`, `stremio_remote=debug`, ...)
pub const LOG_ENV: &str = "STREMIO_REMOTE_LOG";

/// Verbosity selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// Warnings and errors only
    Quiet,
    /// Connection progress and failures
    Normal,
    /// Per-command tracing with source locations
    Debug,
    Trace,
}

impl LoggingMode {
    /// `-v` count to mode (0 = quiet)
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LoggingMode::Quiet,
            1 => LoggingMode::Normal,
            2 => LoggingMode::Debug,
            _ => LoggingMode::Trace,
        }
    }

    fn default_level(&self) -> &'static str {
        match self {
            LoggingMode::Quiet => "warn",
            LoggingMode::Normal => "info",
            LoggingMode::Debug => "debug",
            LoggingMode::Trace => "trace",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid {LOG_ENV} filter: {0}")]
    InvalidEnv(String),
}

/// Install the global subscriber
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = create_env_filter(mode.default_level())?;
    let verbose = matches!(mode, LoggingMode::Debug | LoggingMode::Trace);

    Registry::default()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_file(verbose)
                .with_line_number(verbose)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::TracingInit(e.to_string()))
}

/// `STREMIO_REMOTE_LOG`, then `RUST_LOG`, then the mode's level
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    match std::env::var(LOG_ENV) {
        Ok(spec) => EnvFilter::try_new(&spec).map_err(|e| LoggingError::InvalidEnv(e.to_string())),
        Err(_) => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level))),
    }
}

pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingMode::from_verbosity(0), LoggingMode::Quiet);
        assert_eq!(LoggingMode::from_verbosity(1), LoggingMode::Normal);
        assert_eq!(LoggingMode::from_verbosity(2), LoggingMode::Debug);
        assert_eq!(LoggingMode::from_verbosity(9), LoggingMode::Trace);
        assert_eq!(LoggingMode::Quiet.default_level(), "warn");
    }

    #[test]
    fn test_default_filter_builds() {
        assert!(create_env_filter("info").is_ok());
    }
}
