//! Capture configuration.
//!
//! Configuration is layered the same way everywhere: built-in defaults, then
//! an optional JSON document, then `HTTPREC_*` environment variables.
//!
//! | Variable                     | Field                |
//! |------------------------------|----------------------|
//! | `HTTPREC_STRICT_BODY`        | `strict_body`        |
//! | `HTTPREC_SNIFF_CONTENT_TYPE` | `sniff_content_type` |
//! | `HTTPREC_LOG_MISMATCHES`     | `log_mismatches`     |

use crate::error::{CaptureError, CaptureResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Prefix for all environment variables read by this crate.
pub const ENV_PREFIX: &str = "HTTPREC";

/// Settings for a [`ResponseCapture`](crate::ResponseCapture).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Body mode used by `expect_body`: byte-exact when `true`, tolerating a
    /// single trailing newline when `false`.
    pub strict_body: bool,

    /// Whether the first body write fills in a missing `Content-Type`.
    pub sniff_content_type: bool,

    /// Whether failed comparisons emit a `debug` event.
    pub log_mismatches: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            strict_body: false,
            sniff_content_type: true,
            log_mismatches: true,
        }
    }
}

impl CaptureConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the body comparison mode used by `expect_body`.
    #[must_use]
    pub fn with_strict_body(mut self, strict: bool) -> Self {
        self.strict_body = strict;
        self
    }

    /// Enables or disables `Content-Type` sniffing.
    #[must_use]
    pub fn with_sniff_content_type(mut self, sniff: bool) -> Self {
        self.sniff_content_type = sniff;
        self
    }

    /// Enables or disables mismatch logging.
    #[must_use]
    pub fn with_log_mismatches(mut self, log: bool) -> Self {
        self.log_mismatches = log;
        self
    }

    /// Parses a configuration from a JSON document. Missing fields keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Json`] if the document is invalid or contains
    /// unknown fields.
    pub fn from_json(json: &str) -> CaptureResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `HTTPREC_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::EnvParse`] if a variable is set to something
    /// other than a boolean.
    pub fn from_env() -> CaptureResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Applies `HTTPREC_*` environment variables on top of this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::EnvParse`] if a variable is set to something
    /// other than a boolean.
    pub fn with_env_overrides(self) -> CaptureResult<Self> {
        self.with_overrides(|var| env::var(var).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> CaptureResult<Self> {
        let fields: [(&str, &mut bool); 3] = [
            ("STRICT_BODY", &mut self.strict_body),
            ("SNIFF_CONTENT_TYPE", &mut self.sniff_content_type),
            ("LOG_MISMATCHES", &mut self.log_mismatches),
        ];

        for (suffix, field) in fields {
            let var = format!("{ENV_PREFIX}_{suffix}");
            if let Some(raw) = lookup(&var) {
                *field = parse_bool(&var, &raw)?;
            }
        }

        Ok(self)
    }
}

fn parse_bool(var: &str, raw: &str) -> CaptureResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CaptureError::env_parse(
            var,
            format!("expected a boolean, got {other:?}"),
        )),
    }
}
