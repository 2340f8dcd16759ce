//! Transfer pipeline orchestration.
//!
//! # Design
//! - Steps run strictly in order: package, checksum, route, transfer, cleanup.
//! - Every step is counted in `pipeline_steps_total`; failures are logged once, at the step.
//! - The audit record is written after the transfer settles and never changes its outcome.
//! - Temporary archives are removed only after a successful transfer.

use std::fs;
use std::sync::Arc;

use rawvault_audit::{AuditDelivery, AuditLogger, LocalAuditLog, RemoteAuditSink};
use rawvault_config::{DestinationSpec, TransferConfig, TransferSettings};
use rawvault_core::{BlobStore, RemoteLog, RetryPolicy, describe_chain};
use rawvault_telemetry::Metrics;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};
use crate::executor::{TransferExecutor, TransferOutcome};
use crate::packager;
use crate::router::{self, PrefixKey};
use crate::unit::TransferUnit;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepKind {
    LoadConfig,
    Validate,
    Package,
    Checksum,
    Route,
    Transfer,
    Cleanup,
}

impl StepKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::LoadConfig => "load_config",
            Self::Validate => "validate",
            Self::Package => "package",
            Self::Checksum => "checksum",
            Self::Route => "route",
            Self::Transfer => "transfer",
            Self::Cleanup => "cleanup",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepStatus {
    Started,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Everything a caller learns about one pipeline run.
#[derive(Debug)]
pub struct TransferReport {
    /// Identifier attached to every log event of the run.
    pub run_id: Uuid,
    /// Transfer result; audit failures never turn this into an error.
    pub outcome: PipelineResult<TransferOutcome>,
    /// Per-sink delivery of the audit record.
    pub audit: AuditDelivery,
}

impl TransferReport {
    /// Whether the file reached its destination intact.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs instrument transfers against the configured collaborators.
pub struct TransferService {
    store: Option<Arc<dyn BlobStore>>,
    remote_log: Option<Arc<dyn RemoteLog>>,
    metrics: Metrics,
    retry: RetryPolicy,
}

impl TransferService {
    /// Service that can only copy to local directories until collaborators are attached.
    #[must_use]
    pub fn new(metrics: Metrics) -> Self {
        Self {
            store: None,
            remote_log: None,
            metrics,
            retry: RetryPolicy::default(),
        }
    }

    /// Attach the object store used for uploads.
    #[must_use]
    pub fn with_blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attach the remote log service used for the audit stream.
    #[must_use]
    pub fn with_remote_log(mut self, remote_log: Arc<dyn RemoteLog>) -> Self {
        self.remote_log = Some(remote_log);
        self
    }

    /// Override the retry policy for collaborator calls.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Metrics registry the service reports into.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Validate raw settings and run the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when the settings do not describe a
    /// complete transfer; no audit record is written in that case.
    pub async fn run_settings(&self, settings: &TransferSettings) -> PipelineResult<TransferReport> {
        let config = self.execute_step(StepKind::LoadConfig, || {
            settings.validate().map_err(PipelineError::from)
        })?;
        Ok(self.run(&config).await)
    }

    /// Run the pipeline on a tokio task.
    #[must_use]
    pub fn spawn(self: &Arc<Self>, config: TransferConfig) -> JoinHandle<TransferReport> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.run(&config).await })
    }

    /// Run the pipeline for one transfer and record the result in the audit trail.
    pub async fn run(&self, config: &TransferConfig) -> TransferReport {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "transfer",
            run_id = %run_id,
            instrument = %config.instrument,
            destination = config.destination.kind().as_str(),
        );

        async move {
            let outcome = self.transfer(config).await;
            let destination = config.destination.kind().as_str();
            self.metrics.inc_transfer(destination, outcome.is_ok());
            match &outcome {
                Ok(transferred) => {
                    self.metrics.add_transfer_bytes(transferred.bytes);
                    info!(
                        locator = %transferred.destination_locator,
                        bytes = transferred.bytes,
                        checksum = %transferred.verified_checksum,
                        "transfer completed"
                    );
                }
                Err(err) => {
                    error!(kind = %err.kind(), error = %describe_chain(err), "transfer failed");
                }
            }

            let audit = self
                .audit_logger(config)
                .record(&audit_message(config, &outcome))
                .await;
            if !audit.is_complete() {
                warn!("audit record not delivered to every sink");
            }

            TransferReport {
                run_id,
                outcome,
                audit,
            }
        }
        .instrument(span)
        .await
    }

    async fn transfer(&self, config: &TransferConfig) -> PipelineResult<TransferOutcome> {
        self.execute_step(StepKind::Validate, || {
            self.require_collaborators(&config.destination)
        })?;

        let staging = config.staging_dir();
        let unit = self.execute_step(StepKind::Package, || {
            packager::resolve_transfer_unit(config.source(), config.instrument, &staging)
        })?;
        self.execute_step(StepKind::Checksum, || unit.source_digest().map(|_| ()))?;

        let prefix = PrefixKey::from_file_name(unit.logical_name());
        let container = self.execute_step(StepKind::Route, || {
            router::resolve_container(&config.destination, &prefix)
        })?;

        self.record_step(StepKind::Transfer, StepStatus::Started);
        let result = self
            .executor()
            .execute(&unit, &config.destination, &container)
            .await;
        let outcome = self.finish_step(StepKind::Transfer, result)?;

        self.cleanup(&unit);
        Ok(outcome)
    }

    fn require_collaborators(&self, destination: &DestinationSpec) -> PipelineResult<()> {
        if matches!(destination, DestinationSpec::ObjectStore { .. }) {
            if self.store.is_none() {
                return Err(PipelineError::MissingCollaborator {
                    collaborator: "blob_store",
                });
            }
            if self.remote_log.is_none() {
                return Err(PipelineError::MissingCollaborator {
                    collaborator: "remote_log",
                });
            }
        }
        Ok(())
    }

    fn executor(&self) -> TransferExecutor {
        let executor = TransferExecutor::new().with_retry(self.retry);
        match &self.store {
            Some(store) => executor.with_blob_store(Arc::clone(store)),
            None => executor,
        }
    }

    fn audit_logger(&self, config: &TransferConfig) -> AuditLogger {
        let logger = AuditLogger::new(LocalAuditLog::new(config.audit_log.clone()))
            .with_metrics(self.metrics.clone());
        match (&config.destination, &self.remote_log) {
            (
                DestinationSpec::ObjectStore {
                    log_group,
                    log_stream,
                    ..
                },
                Some(remote_log),
            ) => logger.with_remote(
                RemoteAuditSink::new(Arc::clone(remote_log), log_group.clone(), log_stream.clone())
                    .with_retry(self.retry),
            ),
            _ => logger,
        }
    }

    fn cleanup(&self, unit: &TransferUnit) {
        if !unit.is_temporary() {
            self.record_step(StepKind::Cleanup, StepStatus::Skipped);
            return;
        }
        let removed = self.execute_step(StepKind::Cleanup, || {
            fs::remove_file(unit.path())
                .map_err(|err| PipelineError::io("cleanup.remove_archive", unit.path(), err))
        });
        if removed.is_err() {
            warn!(path = %unit.path().display(), "temporary archive left behind");
        }
    }

    fn execute_step<T, F>(&self, step: StepKind, op: F) -> PipelineResult<T>
    where
        F: FnOnce() -> PipelineResult<T>,
    {
        self.record_step(step, StepStatus::Started);
        self.finish_step(step, op())
    }

    fn finish_step<T>(&self, step: StepKind, result: PipelineResult<T>) -> PipelineResult<T> {
        match &result {
            Ok(_) => self.record_step(step, StepStatus::Completed),
            Err(err) => {
                error!(
                    step = step.as_str(),
                    kind = %err.kind(),
                    error = %describe_chain(err),
                    "pipeline step failed"
                );
                self.record_step(step, StepStatus::Failed);
            }
        }
        result
    }

    fn record_step(&self, step: StepKind, status: StepStatus) {
        self.metrics.inc_pipeline_step(step.as_str(), status.as_str());
    }
}

fn audit_message(config: &TransferConfig, outcome: &PipelineResult<TransferOutcome>) -> String {
    match (outcome, &config.destination) {
        (Ok(transferred), DestinationSpec::ObjectStore { .. }) => format!(
            "File {} uploaded successfully to {}. Original checksum: {}",
            transferred.file_name, transferred.destination_locator, transferred.verified_checksum
        ),
        (Ok(transferred), DestinationSpec::Directory { root }) => format!(
            "File {} copied successfully to {} with verified integrity.",
            transferred.file_name,
            root.display()
        ),
        (Err(PipelineError::Integrity { path, .. }), _) => format!(
            "Error: Integrity check failed for {} after copying.",
            path.file_name()
                .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
        ),
        (Err(err), _) => format!(
            "Transfer of {} failed ({}): {}",
            config.source.display(),
            err.kind(),
            describe_chain(err)
        ),
    }
}
