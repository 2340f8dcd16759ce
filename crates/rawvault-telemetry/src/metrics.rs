//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters the transfer pipeline and audit trail update.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

const DESTINATION_LABELS: [&str; 2] = ["s3", "directory"];
const SINK_LABELS: [&str; 2] = ["local", "remote"];
const OUTCOME_SUCCESS: &str = "success";
const OUTCOME_FAILURE: &str = "failure";

/// Prometheus-backed metrics registry shared across the pipeline.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    pipeline_steps_total: IntCounterVec,
    transfers_total: IntCounterVec,
    transfer_bytes_total: IntCounter,
    audit_appends_total: IntCounterVec,
}

/// Snapshot of transfer and audit counters for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Transfers that completed, across destinations.
    pub transfers_succeeded: u64,
    /// Transfers that failed, across destinations.
    pub transfers_failed: u64,
    /// Bytes moved by successful transfers.
    pub transfer_bytes_total: u64,
    /// Audit appends that failed, across sinks.
    pub audit_append_failures: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built
    /// or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let pipeline_steps_total = counter_vec(
            "pipeline_steps_total",
            "Transfer pipeline steps executed by status",
            &["step", "status"],
        )?;
        let transfers_total = counter_vec(
            "transfers_total",
            "Transfers finished by destination and outcome",
            &["destination", "outcome"],
        )?;
        let transfer_bytes_total = IntCounter::with_opts(Opts::new(
            "transfer_bytes_total",
            "Bytes moved by successful transfers",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "transfer_bytes_total",
            source,
        })?;
        let audit_appends_total = counter_vec(
            "audit_appends_total",
            "Audit record appends by sink and outcome",
            &["sink", "outcome"],
        )?;

        register(&registry, "pipeline_steps_total", &pipeline_steps_total)?;
        register(&registry, "transfers_total", &transfers_total)?;
        register(&registry, "transfer_bytes_total", &transfer_bytes_total)?;
        register(&registry, "audit_appends_total", &audit_appends_total)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                pipeline_steps_total,
                transfers_total,
                transfer_bytes_total,
                audit_appends_total,
            }),
        })
    }

    /// Increment the pipeline step counter.
    pub fn inc_pipeline_step(&self, step: &str, status: &str) {
        self.inner
            .pipeline_steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Record a finished transfer for `destination`.
    pub fn inc_transfer(&self, destination: &str, succeeded: bool) {
        self.inner
            .transfers_total
            .with_label_values(&[destination, outcome_label(succeeded)])
            .inc();
    }

    /// Add bytes moved by a successful transfer.
    pub fn add_transfer_bytes(&self, bytes: u64) {
        self.inner.transfer_bytes_total.inc_by(bytes);
    }

    /// Record an audit append attempt for `sink` (`local` or `remote`).
    pub fn inc_audit_append(&self, sink: &str, succeeded: bool) {
        self.inner
            .audit_appends_total
            .with_label_values(&[sink, outcome_label(succeeded)])
            .inc();
    }

    /// Current count for a single pipeline step and status.
    #[must_use]
    pub fn pipeline_step_count(&self, step: &str, status: &str) -> u64 {
        self.inner
            .pipeline_steps_total
            .with_label_values(&[step, status])
            .get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the transfer and audit counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let transfers = |outcome: &str| -> u64 {
            DESTINATION_LABELS
                .iter()
                .map(|destination| {
                    self.inner
                        .transfers_total
                        .with_label_values(&[*destination, outcome])
                        .get()
                })
                .sum()
        };
        let audit_append_failures = SINK_LABELS
            .iter()
            .map(|sink| {
                self.inner
                    .audit_appends_total
                    .with_label_values(&[*sink, OUTCOME_FAILURE])
                    .get()
            })
            .sum();

        MetricsSnapshot {
            transfers_succeeded: transfers(OUTCOME_SUCCESS),
            transfers_failed: transfers(OUTCOME_FAILURE),
            transfer_bytes_total: self.inner.transfer_bytes_total.get(),
            audit_append_failures,
        }
    }
}

const fn outcome_label(succeeded: bool) -> &'static str {
    if succeeded {
        OUTCOME_SUCCESS
    } else {
        OUTCOME_FAILURE
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
