//! Tracing setup for test runs.
//!
//! The recorder and capture emit `tracing` events (`trace` for writes, `warn`
//! for superfluous status writes, `debug` for failed comparisons). Nothing is
//! printed unless a subscriber is installed; [`init_test_logging`] installs
//! one that writes through the test harness so output is only shown for
//! failing tests.
//!
//! ```rust,ignore
//! #[test]
//! fn test_handler() {
//!     httprec::logging::init_test_logging();
//!     // ...
//! }
//! ```

use crate::error::{CaptureError, CaptureResult};
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable holding the filter directive for test logging.
pub const LOG_ENV_VAR: &str = "HTTPREC_LOG";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g. "warn", "httprec=trace").
    pub level: String,

    /// Whether to route output through the test harness capture.
    pub test_writer: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "warn".to_string(),
            test_writer: true,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Default configuration with the level taken from `HTTPREC_LOG` when set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = env::var(LOG_ENV_VAR) {
            if !level.trim().is_empty() {
                config.level = level;
            }
        }
        config
    }
}

/// Installs a global fmt subscriber according to `config`.
///
/// # Errors
///
/// Returns [`CaptureError::InvalidLogFilter`] if the filter is invalid, and
/// [`CaptureError::LoggingInit`] if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> CaptureResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = EnvFilter::try_new(&config.level).map_err(|e| CaptureError::InvalidLogFilter {
        filter: config.level.clone(),
        reason: e.to_string(),
    })?;

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(config.include_target);

    if config.test_writer {
        tracing_subscriber::registry()
            .with(fmt_layer.with_test_writer().with_filter(filter))
            .try_init()
            .map_err(|e| CaptureError::LoggingInit(e.to_string()))
    } else {
        tracing_subscriber::registry()
            .with(fmt_layer.with_filter(filter))
            .try_init()
            .map_err(|e| CaptureError::LoggingInit(e.to_string()))
    }
}

/// Installs test logging configured from `HTTPREC_LOG`.
///
/// Safe to call from every test: once a subscriber is installed, later calls
/// do nothing.
///
/// An invalid `HTTPREC_LOG` filter is not silently dropped: logging falls
/// back to the default level and a warning names the rejected filter.
pub fn init_test_logging() {
    install_test_logging(&LogConfig::from_env());
}

/// Returns the filter error, if the configured filter had to be replaced.
fn install_test_logging(config: &LogConfig) -> Option<CaptureError> {
    match init_logging(config) {
        // Already installed by an earlier test.
        Ok(()) | Err(CaptureError::LoggingInit(_)) => None,
        Err(e) => {
            let fallback = LogConfig {
                level: LogConfig::default().level,
                ..config.clone()
            };
            if let Err(install) = init_logging(&fallback) {
                tracing::debug!(error = %install, "test logging already installed");
            }
            tracing::warn!(
                filter = %config.level,
                error = %e,
                "ignoring invalid HTTPREC_LOG filter"
            );
            Some(e)
        }
    }
}
