//! Fallback values applied by the settings loaders.
//!
//! # Design
//! - Keep the historical command-line defaults in one place.
//! - Validation never reads these; only loaders fill absent fields.

/// Remote log group used when none is configured.
pub(crate) const LOG_GROUP: &str = "S3UploadLogs";
/// Remote log stream used when none is configured.
pub(crate) const LOG_STREAM: &str = "InstrumentUploads";
/// Local audit file used when none is configured.
pub(crate) const AUDIT_LOG: &str = "local_log.txt";
