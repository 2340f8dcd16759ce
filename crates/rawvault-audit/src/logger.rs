//! Combined audit logger with best-effort delivery.
//!
//! # Design
//! - `append` targets one sink and reports its error to the caller.
//! - `record` writes to every configured sink and never fails; it reports
//!   per-sink delivery instead.
//! - A remote failure is noted in the local file so the local trail stays complete.

use rawvault_core::{FailureKind, describe_chain};
use rawvault_telemetry::Metrics;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{AuditError, AuditResult};
use crate::local::LocalAuditLog;
use crate::remote::RemoteAuditSink;

/// Destination of a single audit append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSink {
    /// Local append-only file.
    Local,
    /// Remote sequenced log stream.
    Remote,
}

impl AuditSink {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Outcome of delivering one record to one sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// The record was written.
    Delivered,
    /// The record was not written.
    Failed {
        /// Failure classification.
        kind: FailureKind,
        /// Error chain rendered as text.
        detail: String,
    },
}

impl DeliveryStatus {
    fn from_result(result: &AuditResult<()>) -> Self {
        match result {
            Ok(()) => Self::Delivered,
            Err(err) => Self::Failed {
                kind: err.kind(),
                detail: describe_chain(err),
            },
        }
    }

    /// Whether the record was written.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Per-sink delivery report for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditDelivery {
    /// Local file delivery.
    pub local: DeliveryStatus,
    /// Remote stream delivery; `None` when no remote sink is configured.
    pub remote: Option<DeliveryStatus>,
}

impl AuditDelivery {
    /// Whether every configured sink received the record.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.local.is_delivered()
            && self
                .remote
                .as_ref()
                .is_none_or(DeliveryStatus::is_delivered)
    }
}

/// Audit logger writing to a local file and, optionally, a remote stream.
pub struct AuditLogger {
    local: LocalAuditLog,
    remote: Option<RemoteAuditSink>,
    metrics: Option<Metrics>,
}

impl AuditLogger {
    /// Logger with only the local sink.
    #[must_use]
    pub fn new(local: LocalAuditLog) -> Self {
        Self {
            local,
            remote: None,
            metrics: None,
        }
    }

    /// Attach a remote sink.
    #[must_use]
    pub fn with_remote(mut self, remote: RemoteAuditSink) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Attach a metrics registry for append counters.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Local sink.
    #[must_use]
    pub const fn local(&self) -> &LocalAuditLog {
        &self.local
    }

    /// Remote sink, when configured.
    #[must_use]
    pub const fn remote(&self) -> Option<&RemoteAuditSink> {
        self.remote.as_ref()
    }

    /// Append `message` to a single sink.
    ///
    /// # Errors
    ///
    /// Returns the sink's error, or [`AuditError::RemoteUnavailable`] when the
    /// remote sink is requested but not configured.
    pub async fn append(&self, sink: AuditSink, message: &str) -> AuditResult<()> {
        let result = match sink {
            AuditSink::Local => self.local.append(message),
            AuditSink::Remote => match &self.remote {
                Some(remote) => remote.append(message).await,
                None => Err(AuditError::RemoteUnavailable),
            },
        };
        if let Some(metrics) = &self.metrics {
            metrics.inc_audit_append(sink.as_str(), result.is_ok());
        }
        result
    }

    /// Record `message` on every configured sink without failing.
    ///
    /// The remote stream is written first; a remote failure is logged with
    /// `warn!` and noted in the local file after the record itself.
    pub async fn record(&self, message: &str) -> AuditDelivery {
        let remote = match self.remote {
            Some(_) => Some(self.append(AuditSink::Remote, message).await),
            None => None,
        };

        let local = self.append(AuditSink::Local, message).await;
        if let Err(err) = &local {
            error!(error = %describe_chain(err), path = %self.local.path().display(), "local audit append failed");
        }

        if let Some(Err(err)) = &remote {
            let detail = describe_chain(err);
            warn!(error = %detail, kind = %err.kind(), "remote audit append failed");
            if local.is_ok() {
                let note = format!("Remote audit append failed ({}): {detail}", err.kind());
                if let Err(note_err) = self.append(AuditSink::Local, &note).await {
                    error!(error = %describe_chain(&note_err), "failed to note remote audit failure");
                }
            }
        }

        AuditDelivery {
            local: DeliveryStatus::from_result(&local),
            remote: remote.as_ref().map(DeliveryStatus::from_result),
        }
    }
}
