//! Remote sequenced log stream sink.
//!
//! # Design
//! - `Uninitialized` sinks create the group, then the stream; "already exists" is success.
//! - A failed setup leaves the sink `Uninitialized` so the next append tries again.
//! - Every append fetches a fresh token immediately before its put; tokens are never cached.
//! - The state lock is held from token fetch to put, so appends through one sink never race.

use std::sync::Arc;

use chrono::Utc;
use rawvault_core::{LogError, LogEvent, LogResult, RemoteLog, RetryPolicy};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AuditError, AuditResult};

/// Lifecycle of a [`RemoteAuditSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Group and stream have not been confirmed yet.
    Uninitialized,
    /// Group and stream exist; appends go straight to token fetch and put.
    Ready,
}

/// Audit sink that appends to one remote log stream.
pub struct RemoteAuditSink {
    log: Arc<dyn RemoteLog>,
    group: String,
    stream: String,
    retry: RetryPolicy,
    state: Mutex<SinkState>,
}

impl RemoteAuditSink {
    /// Sink for `group`/`stream`, using the default retry policy.
    #[must_use]
    pub fn new(log: Arc<dyn RemoteLog>, group: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            log,
            group: group.into(),
            stream: stream.into(),
            retry: RetryPolicy::default(),
            state: Mutex::new(SinkState::Uninitialized),
        }
    }

    /// Override the retry policy used for setup and token fetches.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Log group name.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Log stream name.
    #[must_use]
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SinkState {
        *self.state.lock().await
    }

    /// Append one record to the stream.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Setup`] when the group or stream cannot be
    /// created and [`AuditError::Append`] when the token fetch or the put
    /// fails. A put rejected for a stale token is not retried here; calling
    /// `append` again fetches a fresh token.
    pub async fn append(&self, message: &str) -> AuditResult<()> {
        let mut state = self.state.lock().await;
        if *state == SinkState::Uninitialized {
            self.initialise().await?;
            *state = SinkState::Ready;
        }

        let token = self
            .retry
            .run("next_token", || self.log.next_token(&self.group, &self.stream))
            .await
            .map_err(|source| self.append_error("next_token", source))?;
        debug!(
            group = %self.group,
            stream = %self.stream,
            token = token.as_ref().map_or("none", |value| value.as_str()),
            "fetched sequence token"
        );

        let event = LogEvent {
            timestamp_ms: Utc::now().timestamp_millis(),
            message: message.to_string(),
        };
        self.log
            .put_events(&self.group, &self.stream, token, vec![event])
            .await
            .map_err(|source| self.append_error("put_events", source))?;
        Ok(())
    }

    async fn initialise(&self) -> AuditResult<()> {
        let group = self
            .retry
            .run("ensure_group", || self.log.ensure_group(&self.group))
            .await;
        tolerate_existing(group).map_err(|source| AuditError::Setup {
            operation: "ensure_group",
            name: self.group.clone(),
            source,
        })?;

        let stream = self
            .retry
            .run("ensure_stream", || {
                self.log.ensure_stream(&self.group, &self.stream)
            })
            .await;
        tolerate_existing(stream).map_err(|source| AuditError::Setup {
            operation: "ensure_stream",
            name: self.stream.clone(),
            source,
        })?;

        debug!(group = %self.group, stream = %self.stream, "remote audit stream ready");
        Ok(())
    }

    fn append_error(&self, operation: &'static str, source: LogError) -> AuditError {
        AuditError::Append {
            operation,
            stream: self.stream.clone(),
            source,
        }
    }
}

fn tolerate_existing(result: LogResult<()>) -> LogResult<()> {
    match result {
        Err(err) if err.is_already_exists() => Ok(()),
        other => other,
    }
}
