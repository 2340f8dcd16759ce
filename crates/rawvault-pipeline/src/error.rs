//! # Design
//!
//! - Provide structured, constant-message errors for the transfer pipeline.
//! - Capture operation context (paths, digests, destinations) so failures are reproducible.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use rawvault_config::ConfigError;
use rawvault_core::{ContentDigest, FailureKind, StoreError};
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Underlying cause of an archive creation failure.
#[derive(Debug, Error)]
pub enum PackagingCause {
    /// Reading the source tree or writing the archive file failed.
    #[error("archive io failure")]
    Io(#[source] io::Error),
    /// Traversing the source tree failed.
    #[error("archive traversal failure")]
    Walk(#[source] walkdir::Error),
    /// The zip encoder failed.
    #[error("archive encoding failure")]
    Zip(#[source] zip::result::ZipError),
    /// An entry is neither a regular file nor a directory.
    #[error("unsupported archive entry type")]
    UnsupportedEntry,
}

/// Underlying cause of a copy or upload failure.
#[derive(Debug, Error)]
pub enum TransferCause {
    /// Writing the local destination failed.
    #[error("local copy failed")]
    Copy(#[source] io::Error),
    /// The blob store rejected or failed the upload.
    #[error("object store upload failed")]
    Store(#[source] StoreError),
    /// The destination path resolves to the source file itself.
    #[error("destination is the source file")]
    SameFile,
}

/// Errors produced by the transfer pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Expected source or transfer unit is missing.
    #[error("pipeline source not found")]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// Archive creation failed.
    #[error("pipeline packaging failure")]
    Packaging {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying packaging error.
        source: PackagingCause,
    },
    /// IO failures while interacting with the filesystem.
    #[error("pipeline io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Copy or upload to the destination failed.
    #[error("pipeline transfer failure")]
    Transfer {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Destination locator the transfer targeted.
        destination: String,
        /// Underlying transfer error.
        source: TransferCause,
    },
    /// Digest of the copied bytes differs from the source digest.
    #[error("pipeline integrity mismatch")]
    Integrity {
        /// Copied file, left in place for inspection.
        path: PathBuf,
        /// Digest computed before the copy.
        expected: ContentDigest,
        /// Digest of the copied bytes.
        actual: ContentDigest,
    },
    /// Invocation configuration was invalid.
    #[error("pipeline configuration invalid")]
    Config {
        /// Underlying configuration error.
        #[from]
        source: ConfigError,
    },
    /// A collaborator required by the destination was not supplied.
    #[error("pipeline collaborator missing")]
    MissingCollaborator {
        /// Collaborator that was expected.
        collaborator: &'static str,
    },
    /// A container handle did not match the destination kind.
    #[error("pipeline container mismatch")]
    ContainerMismatch {
        /// Destination kind label.
        destination: &'static str,
    },
}

impl PipelineError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn packaging(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: PackagingCause,
    ) -> Self {
        Self::Packaging {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(path: impl Into<PathBuf>, reason: &'static str) -> Self {
        Self::NotFound {
            path: path.into(),
            reason,
        }
    }

    pub(crate) fn transfer(
        operation: &'static str,
        destination: impl Into<String>,
        source: TransferCause,
    ) -> Self {
        Self::Transfer {
            operation,
            destination: destination.into(),
            source,
        }
    }

    /// Failure kind surfaced to callers.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Packaging { .. } => FailureKind::Packaging,
            Self::Io { .. } => FailureKind::Io,
            Self::Transfer { .. } => FailureKind::Transfer,
            Self::Integrity { .. } => FailureKind::Integrity,
            Self::Config { .. } | Self::MissingCollaborator { .. } | Self::ContainerMismatch { .. } => {
                FailureKind::Config
            }
        }
    }

    /// Whether the failure came from a collaborator outage that may clear up.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transfer {
                source: TransferCause::Store(store),
                ..
            } => store.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn pipeline_errors_map_to_failure_kinds() {
        let cases = [
            (PipelineError::not_found("/data/missing.raw", "missing"), FailureKind::NotFound),
            (
                PipelineError::packaging(
                    "package.finish",
                    "/tmp/a.zip",
                    PackagingCause::Zip(zip::result::ZipError::FileNotFound),
                ),
                FailureKind::Packaging,
            ),
            (
                PipelineError::io("checksum.open", "/data/a.raw", io::Error::other("io")),
                FailureKind::Io,
            ),
            (
                PipelineError::transfer(
                    "copy",
                    "/archive/a/a.raw",
                    TransferCause::Copy(io::Error::other("disk full")),
                ),
                FailureKind::Transfer,
            ),
            (
                PipelineError::Integrity {
                    path: PathBuf::from("/archive/a/a.raw"),
                    expected: ContentDigest::from_hex("aa"),
                    actual: ContentDigest::from_hex("bb"),
                },
                FailureKind::Integrity,
            ),
            (
                PipelineError::from(ConfigError::MissingField { field: "bucket" }),
                FailureKind::Config,
            ),
            (
                PipelineError::MissingCollaborator {
                    collaborator: "blob_store",
                },
                FailureKind::Config,
            ),
        ];
        for (error, kind) in cases {
            assert_eq!(error.kind(), kind);
        }
    }

    #[test]
    fn only_store_outages_are_transient() {
        let outage = PipelineError::transfer(
            "put_object",
            "s3://b1/a/a.raw",
            TransferCause::Store(StoreError::Unavailable {
                operation: "put_object",
                source: Box::new(io::Error::other("timeout")),
            }),
        );
        assert!(outage.is_transient());
        assert!(outage.source().is_some());

        let copy = PipelineError::transfer(
            "copy",
            "/archive/a/a.raw",
            TransferCause::Copy(io::Error::other("disk full")),
        );
        assert!(!copy.is_transient());
    }
}
