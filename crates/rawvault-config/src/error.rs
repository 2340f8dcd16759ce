//! Error types for configuration operations.

use rawvault_core::FailureKind;
use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field required by the chosen destination kind was absent.
    #[error("missing configuration field")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A JSON settings document could not be decoded.
    #[error("invalid configuration document")]
    Json {
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Failure kind surfaced to pipeline callers.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        FailureKind::Config
    }

    pub(crate) fn invalid(field: &'static str, value: &str, reason: &'static str) -> Self {
        Self::InvalidField {
            field,
            value: Some(value.to_string()),
            reason,
        }
    }
}
