//! Settings sources: process environment, arbitrary lookups, and JSON documents.
//!
//! Loaders fill the historical defaults for the log group, log stream, and
//! audit file when those are absent; every other field is passed through as-is.

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::validate::TransferSettings;

/// Prefix shared by every environment variable the loader reads.
pub const ENV_PREFIX: &str = "RAWVAULT_";

const INSTRUMENT: &str = "INSTRUMENT";
const SOURCE: &str = "SOURCE";
const DESTINATION: &str = "DESTINATION";
const BUCKET: &str = "BUCKET";
const DIRECTORY: &str = "DIRECTORY";
const LOG_GROUP: &str = "LOG_GROUP";
const LOG_STREAM: &str = "LOG_STREAM";
const AUDIT_LOG: &str = "AUDIT_LOG";
const STAGING_DIR: &str = "STAGING_DIR";

impl TransferSettings {
    /// Read settings from `RAWVAULT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which receives full variable names
    /// such as `RAWVAULT_BUCKET`.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));
        Self {
            instrument: get(INSTRUMENT),
            source: get(SOURCE),
            destination: get(DESTINATION),
            bucket: get(BUCKET),
            directory: get(DIRECTORY),
            log_group: get(LOG_GROUP),
            log_stream: get(LOG_STREAM),
            audit_log: get(AUDIT_LOG),
            staging_dir: get(STAGING_DIR),
        }
        .with_defaults()
    }

    /// Decode settings from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] when the document is malformed or carries
    /// unknown fields.
    pub fn from_json_str(document: &str) -> ConfigResult<Self> {
        let settings: Self =
            serde_json::from_str(document).map_err(|source| ConfigError::Json { source })?;
        Ok(settings.with_defaults())
    }

    /// Fill the log group, log stream, and audit file when absent.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.log_group
            .get_or_insert_with(|| defaults::LOG_GROUP.to_string());
        self.log_stream
            .get_or_insert_with(|| defaults::LOG_STREAM.to_string());
        self.audit_log
            .get_or_insert_with(|| defaults::AUDIT_LOG.to_string());
        self
    }
}
