//! Error types for recording and request building.
//!
//! Comparison operations never return these: a mismatch, a malformed JSON
//! body or an unparsable `Content-Type` is reported through the boolean
//! result of the `expect_*` call. `CaptureError` covers the helpers that can
//! genuinely fail (collecting a handler's body, building a request, reading
//! configuration, installing a subscriber).

use thiserror::Error;

/// Result alias used throughout the crate.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors that can occur while recording responses or preparing tests.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Collecting a response body failed.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A `Content-Type` value could not be parsed as a media type.
    #[error("invalid media type {value:?}: {reason}")]
    InvalidMediaType {
        /// The raw header value.
        value: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A header name or value is invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A request could not be built.
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// An environment variable held an unusable value.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParse {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// A log filter directive could not be parsed.
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidLogFilter {
        /// The rejected directive.
        filter: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Installing the tracing subscriber failed.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

impl CaptureError {
    /// Create an invalid media type error.
    pub fn invalid_media_type(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMediaType {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an environment parse error.
    pub fn env_parse(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParse {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error came from JSON handling.
    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    /// Returns `true` if this error came from media type parsing.
    #[must_use]
    pub fn is_media_type(&self) -> bool {
        matches!(self, Self::InvalidMediaType { .. })
    }
}
