//! # Design
//!
//! - Separate local sink failures (filesystem) from remote ones (log service).
//! - Keep the remote collaborator error as the source so transience stays visible.

use std::io;
use std::path::PathBuf;

use rawvault_core::{FailureKind, LogError};
use thiserror::Error;

/// Result alias for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors produced while recording audit entries.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Writing the local audit file failed.
    #[error("local audit sink failure")]
    LocalSink {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Audit file involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Creating the remote group or stream failed.
    #[error("remote audit setup failed")]
    Setup {
        /// Setup step that failed.
        operation: &'static str,
        /// Group or stream name involved.
        name: String,
        /// Underlying log service error.
        source: LogError,
    },
    /// Fetching a token for, or putting, a remote record failed.
    #[error("remote audit append failed")]
    Append {
        /// Append step that failed.
        operation: &'static str,
        /// Stream targeted by the append.
        stream: String,
        /// Underlying log service error.
        source: LogError,
    },
    /// No remote sink is configured for this logger.
    #[error("remote audit sink not configured")]
    RemoteUnavailable,
}

impl AuditError {
    pub(crate) fn local(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LocalSink {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Failure kind surfaced to callers.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::LocalSink { .. } => FailureKind::Io,
            Self::Setup { .. } | Self::Append { .. } | Self::RemoteUnavailable => {
                FailureKind::LogAppend
            }
        }
    }

    /// Whether repeating the whole append may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Setup { source, .. } | Self::Append { source, .. } => source.is_transient(),
            Self::LocalSink { .. } | Self::RemoteUnavailable => false,
        }
    }

    /// Whether the remote service rejected the sequencing token.
    #[must_use]
    pub const fn is_stale_token(&self) -> bool {
        matches!(
            self,
            Self::Append {
                source: LogError::InvalidSequenceToken { .. },
                ..
            }
        )
    }
}
