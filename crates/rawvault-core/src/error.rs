//! # Design
//!
//! - One failure taxonomy shared by every crate so callers can branch on the kind.
//! - Collaborator errors keep constant messages; context lives in named fields.
//! - Transience is a property of the error, not of the call site.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of every terminal failure the pipeline can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Expected source or transfer unit is missing.
    NotFound,
    /// Archive creation failed.
    Packaging,
    /// Filesystem-level failure.
    Io,
    /// Copy or upload failed.
    Transfer,
    /// Post-transfer digest mismatch.
    Integrity,
    /// Remote log rejected a write.
    LogAppend,
    /// Invalid or missing destination configuration.
    Config,
}

impl FailureKind {
    /// Stable identifier used in logs, metrics, and audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Packaging => "packaging",
            Self::Io => "io",
            Self::Transfer => "transfer",
            Self::Integrity => "integrity",
            Self::LogAppend => "log_append",
            Self::Config => "config",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Render an error and its source chain as one line, outermost first.
#[must_use]
pub fn describe_chain(error: &(dyn Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}

/// Result alias for blob store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a blob store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or timed out; the call may succeed later.
    #[error("blob store unavailable")]
    Unavailable {
        /// Store operation that failed.
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The store refused the request outright.
    #[error("blob store rejected request")]
    Rejected {
        /// Store operation that failed.
        operation: &'static str,
        /// Reason supplied by the store.
        reason: String,
    },
    /// The local bytes destined for the store could not be read.
    #[error("blob store source unreadable")]
    Source {
        /// Store operation that failed.
        operation: &'static str,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

impl StoreError {
    /// Failure kind surfaced to pipeline callers.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        FailureKind::Transfer
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result alias for remote log calls.
pub type LogResult<T> = Result<T, LogError>;

/// Errors reported by a remote sequenced log collaborator.
#[derive(Debug, Error)]
pub enum LogError {
    /// The group or stream being created already exists.
    #[error("log resource already exists")]
    AlreadyExists {
        /// Resource type (`group` or `stream`).
        resource: &'static str,
        /// Name of the existing resource.
        name: String,
    },
    /// The sequencing token supplied with a put was stale or malformed.
    #[error("log sequence token rejected")]
    InvalidSequenceToken {
        /// Stream the put targeted.
        stream: String,
        /// Token the service expected, when reported.
        expected: Option<String>,
    },
    /// The named group or stream does not exist.
    #[error("log resource not found")]
    NotFound {
        /// Resource type (`group` or `stream`).
        resource: &'static str,
        /// Name of the missing resource.
        name: String,
    },
    /// The log service could not be reached or timed out.
    #[error("log service unavailable")]
    Unavailable {
        /// Log operation that failed.
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The log service refused the request outright.
    #[error("log service rejected request")]
    Rejected {
        /// Log operation that failed.
        operation: &'static str,
        /// Reason supplied by the service.
        reason: String,
    },
}

impl LogError {
    /// Failure kind surfaced to audit callers.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        FailureKind::LogAppend
    }

    /// Whether retrying the same call may succeed.
    ///
    /// A rejected sequence token is never transient: only a fresh token fetch
    /// can recover from it.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Whether this error reports a resource that already exists.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
