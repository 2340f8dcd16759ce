//! Copy or upload of a transfer unit, with integrity evidence.
//!
//! # Design
//! - Local copies are re-digested after the copy; a mismatch is reported and
//!   the copied file is left in place.
//! - Uploads carry the source digest and length; the store acknowledgement is
//!   the integrity evidence for that path.
//! - Store calls go through the retry policy; only transient failures retry.

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;
use std::sync::Arc;

use rawvault_config::DestinationSpec;
use rawvault_core::{BlobStore, ContentDigest, PutObjectRequest, RetryPolicy};
use serde::Serialize;
use tracing::{debug, info};

use crate::checksum;
use crate::error::{PipelineError, PipelineResult, TransferCause};
use crate::router::ContainerHandle;
use crate::unit::TransferUnit;

/// How the destination bytes were shown to match the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Verification {
    /// The copied file was re-read and its digest matched.
    DigestMatched,
    /// The object store acknowledged the upload.
    StoreAcknowledged {
        /// Entity tag returned by the store, if any.
        e_tag: Option<String>,
    },
}

/// Result of a successful copy or upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    /// Base name of the transferred file.
    pub file_name: String,
    /// `s3://bucket/key` or the absolute destination path.
    pub destination_locator: String,
    /// Bytes moved.
    pub bytes: u64,
    /// Digest of the source bytes.
    pub verified_checksum: ContentDigest,
    /// Evidence that the destination matches the source.
    pub verification: Verification,
}

/// Moves transfer units to their resolved container.
#[derive(Clone, Default)]
pub struct TransferExecutor {
    store: Option<Arc<dyn BlobStore>>,
    retry: RetryPolicy,
}

impl TransferExecutor {
    /// Executor without an object store; only local copies succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the object store used for uploads.
    #[must_use]
    pub fn with_blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the retry policy for store calls.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Move `unit` into `container` under `destination`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Transfer`] if the copy or upload fails.
    /// - [`PipelineError::Integrity`] if the local copy does not match.
    /// - [`PipelineError::MissingCollaborator`] if an upload is needed but no
    ///   store was attached.
    /// - [`PipelineError::ContainerMismatch`] if `container` was resolved for a
    ///   different destination kind.
    pub async fn execute(
        &self,
        unit: &TransferUnit,
        destination: &DestinationSpec,
        container: &ContainerHandle,
    ) -> PipelineResult<TransferOutcome> {
        match (destination, container) {
            (DestinationSpec::ObjectStore { bucket, .. }, ContainerHandle::KeyPrefix(prefix)) => {
                self.upload(unit, bucket, prefix).await
            }
            (DestinationSpec::Directory { .. }, ContainerHandle::Directory(directory)) => {
                copy_verified(unit, directory)
            }
            (spec, _) => Err(PipelineError::ContainerMismatch {
                destination: spec.kind().as_str(),
            }),
        }
    }

    async fn upload(
        &self,
        unit: &TransferUnit,
        bucket: &str,
        prefix: &str,
    ) -> PipelineResult<TransferOutcome> {
        let store = self.store.clone().ok_or(PipelineError::MissingCollaborator {
            collaborator: "blob_store",
        })?;
        let digest = unit.source_digest()?.clone();
        let key = format!("{prefix}{}", unit.logical_name());
        let locator = format!("s3://{bucket}/{key}");
        let request = PutObjectRequest {
            bucket: bucket.to_string(),
            key,
            source: unit.path().to_path_buf(),
            content_length: unit.size_bytes(),
            digest: digest.clone(),
        };

        debug!(locator = %locator, bytes = unit.size_bytes(), "uploading transfer unit");
        let ack = self
            .retry
            .run("put_object", || {
                let store = Arc::clone(&store);
                let request = request.clone();
                async move { store.put_object(request).await }
            })
            .await
            .map_err(|err| PipelineError::transfer("put_object", &locator, TransferCause::Store(err)))?;

        info!(locator = %locator, e_tag = ?ack.e_tag, "upload acknowledged");
        Ok(TransferOutcome {
            file_name: unit.logical_name().to_string(),
            destination_locator: locator,
            bytes: unit.size_bytes(),
            verified_checksum: digest,
            verification: Verification::StoreAcknowledged { e_tag: ack.e_tag },
        })
    }
}

fn copy_verified(unit: &TransferUnit, directory: &Path) -> PipelineResult<TransferOutcome> {
    let expected = unit.source_digest()?.clone();
    let target = directory.join(unit.logical_name());
    let locator = target.display().to_string();
    if is_same_file(unit.path(), &target)? {
        return Err(PipelineError::transfer(
            "copy.same_file",
            &locator,
            TransferCause::SameFile,
        ));
    }

    let bytes = fs::copy(unit.path(), &target)
        .map_err(|err| PipelineError::transfer("copy", &locator, TransferCause::Copy(err)))?;
    preserve_modified_time(unit.path(), &target)?;

    let actual = checksum::digest_file(&target)?;
    if actual != expected {
        return Err(PipelineError::Integrity {
            path: target,
            expected,
            actual,
        });
    }

    info!(destination = %locator, bytes, "copy verified");
    Ok(TransferOutcome {
        file_name: unit.logical_name().to_string(),
        destination_locator: locator,
        bytes,
        verified_checksum: expected,
        verification: Verification::DigestMatched,
    })
}

fn is_same_file(source: &Path, target: &Path) -> PipelineResult<bool> {
    let target = match fs::canonicalize(target) {
        Ok(target) => target,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(PipelineError::io("copy.resolve_target", target, err)),
    };
    let source =
        fs::canonicalize(source).map_err(|err| PipelineError::io("copy.resolve_source", source, err))?;
    Ok(source == target)
}

fn preserve_modified_time(source: &Path, target: &Path) -> PipelineResult<()> {
    let modified = fs::metadata(source)
        .and_then(|metadata| metadata.modified())
        .map_err(|err| PipelineError::io("copy.source_times", source, err))?;
    let file = File::options()
        .write(true)
        .open(target)
        .map_err(|err| PipelineError::io("copy.open_target", target, err))?;
    file.set_times(FileTimes::new().set_modified(modified))
        .map_err(|err| PipelineError::io("copy.set_times", target, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawvault_core::StoreError;
    use rawvault_test_support::fixtures::write_file;
    use rawvault_test_support::mocks::InMemoryBlobStore;

    type TestResult<T> = anyhow::Result<T>;

    fn directory(root: &Path) -> DestinationSpec {
        DestinationSpec::Directory {
            root: root.to_path_buf(),
        }
    }

    fn object_store() -> DestinationSpec {
        DestinationSpec::ObjectStore {
            bucket: "b1".into(),
            log_group: "S3UploadLogs".into(),
            log_stream: "InstrumentUploads".into(),
        }
    }

    #[tokio::test]
    async fn local_copy_is_verified_and_keeps_mtime() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let source = write_file(&temp.path().join("data/GER001_A.raw"), b"spectra")?;
        let container = temp.path().join("archive/GER001");
        fs::create_dir_all(&container)?;

        let unit = TransferUnit::original(&source)?;
        let outcome = TransferExecutor::new()
            .execute(
                &unit,
                &directory(&temp.path().join("archive")),
                &ContainerHandle::Directory(container.clone()),
            )
            .await?;

        let target = container.join("GER001_A.raw");
        assert_eq!(outcome.verification, Verification::DigestMatched);
        assert_eq!(outcome.bytes, 7);
        assert_eq!(outcome.destination_locator, target.display().to_string());
        assert_eq!(fs::read(&target)?, b"spectra");
        assert_eq!(
            fs::metadata(&target)?.modified()?,
            fs::metadata(&source)?.modified()?
        );
        Ok(())
    }

    #[tokio::test]
    async fn source_changed_after_digest_is_an_integrity_failure() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let source = write_file(&temp.path().join("RUN001.raw"), b"original bytes")?;
        let container = temp.path().join("archive/RUN001.raw");
        fs::create_dir_all(&container)?;

        let unit = TransferUnit::original(&source)?;
        unit.source_digest()?;
        fs::write(&source, b"rewritten bytes")?;

        let result = TransferExecutor::new()
            .execute(
                &unit,
                &directory(&temp.path().join("archive")),
                &ContainerHandle::Directory(container.clone()),
            )
            .await;
        match result {
            Err(PipelineError::Integrity { path, expected, actual }) => {
                assert_eq!(path, container.join("RUN001.raw"));
                assert_ne!(expected, actual);
                assert!(path.exists());
            }
            other => anyhow::bail!("expected integrity failure, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn source_already_in_its_container_is_left_intact() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().join("archive");
        let container = root.join("GER001");
        let source = write_file(&container.join("GER001_A.raw"), b"instrument bytes to keep")?;

        let unit = TransferUnit::original(&source)?;
        let result = TransferExecutor::new()
            .execute(
                &unit,
                &directory(&root),
                &ContainerHandle::Directory(container),
            )
            .await;
        assert!(matches!(
            result,
            Err(PipelineError::Transfer {
                operation: "copy.same_file",
                source: TransferCause::SameFile,
                ..
            })
        ));
        assert_eq!(fs::read(&source)?, b"instrument bytes to keep");
        Ok(())
    }

    #[tokio::test]
    async fn upload_uses_prefix_key_and_digest() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let source = write_file(&temp.path().join("SAMPLE_01.d.zip"), b"archive")?;
        let store = InMemoryBlobStore::new();

        let unit = TransferUnit::original(&source)?;
        let outcome = TransferExecutor::new()
            .with_blob_store(Arc::new(store.clone()))
            .execute(
                &unit,
                &object_store(),
                &ContainerHandle::KeyPrefix("SAMPLE/".into()),
            )
            .await?;

        assert_eq!(outcome.destination_locator, "s3://b1/SAMPLE/SAMPLE_01.d.zip");
        assert!(matches!(
            outcome.verification,
            Verification::StoreAcknowledged { e_tag: Some(_) }
        ));
        let stored = store
            .object("b1", "SAMPLE/SAMPLE_01.d.zip")
            .ok_or_else(|| anyhow::anyhow!("object missing"))?;
        assert_eq!(stored.bytes, b"archive");
        assert_eq!(&stored.digest, unit.source_digest()?);
        Ok(())
    }

    #[tokio::test]
    async fn transient_store_failures_are_retried() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let source = write_file(&temp.path().join("SAMPLE_01.d.zip"), b"archive")?;
        let store = InMemoryBlobStore::new();
        store.fail_next(2);

        let unit = TransferUnit::original(&source)?;
        TransferExecutor::new()
            .with_blob_store(Arc::new(store.clone()))
            .with_retry(RetryPolicy::immediate(3))
            .execute(&unit, &object_store(), &ContainerHandle::KeyPrefix("SAMPLE/".into()))
            .await?;
        assert_eq!(store.put_calls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_upload_is_a_transfer_failure() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let source = write_file(&temp.path().join("SAMPLE_01.d.zip"), b"archive")?;
        let store = InMemoryBlobStore::new();
        store.reject_all("access denied");

        let unit = TransferUnit::original(&source)?;
        let result = TransferExecutor::new()
            .with_blob_store(Arc::new(store.clone()))
            .with_retry(RetryPolicy::immediate(3))
            .execute(&unit, &object_store(), &ContainerHandle::KeyPrefix("SAMPLE/".into()))
            .await;
        assert!(matches!(
            result,
            Err(PipelineError::Transfer {
                source: TransferCause::Store(StoreError::Rejected { .. }),
                ..
            })
        ));
        assert_eq!(store.put_calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn upload_without_store_and_mismatched_container_fail_fast() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let source = write_file(&temp.path().join("A_1.raw"), b"x")?;
        let unit = TransferUnit::original(&source)?;
        let executor = TransferExecutor::new();

        let missing = executor
            .execute(&unit, &object_store(), &ContainerHandle::KeyPrefix("A/".into()))
            .await;
        assert!(matches!(
            missing,
            Err(PipelineError::MissingCollaborator {
                collaborator: "blob_store"
            })
        ));

        let mismatched = executor
            .execute(
                &unit,
                &directory(temp.path()),
                &ContainerHandle::KeyPrefix("A/".into()),
            )
            .await;
        assert!(matches!(
            mismatched,
            Err(PipelineError::ContainerMismatch {
                destination: "directory"
            })
        ));
        Ok(())
    }
}
