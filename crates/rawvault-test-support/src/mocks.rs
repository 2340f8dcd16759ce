//! In-memory collaborators with failure injection.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rawvault_core::{
    BlobStore, ContentDigest, LogError, LogEvent, LogResult, ObjectAck, PutEventsAck,
    PutObjectRequest, RemoteLog, SequenceToken, StoreError, StoreResult,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn outage(operation: &'static str) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("{operation} timed out"),
    ))
}

/// Object captured by [`InMemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Uploaded bytes.
    pub bytes: Vec<u8>,
    /// Digest the uploader declared.
    pub digest: ContentDigest,
}

#[derive(Default)]
struct StoreState {
    objects: BTreeMap<(String, String), StoredObject>,
    put_calls: usize,
    transient_failures: usize,
    rejection: Option<String>,
}

/// Blob store that keeps uploads in memory.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` uploads with a transient outage.
    pub fn fail_next(&self, count: usize) {
        lock(&self.state).transient_failures = count;
    }

    /// Reject every upload with `reason`.
    pub fn reject_all(&self, reason: impl Into<String>) {
        lock(&self.state).rejection = Some(reason.into());
    }

    /// Object stored under `bucket`/`key`, if any.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        lock(&self.state)
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys stored in `bucket`, in lexicographic order.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        lock(&self.state)
            .objects
            .keys()
            .filter(|(stored_bucket, _)| stored_bucket == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Number of `put_object` calls observed, including failed ones.
    #[must_use]
    pub fn put_calls(&self) -> usize {
        lock(&self.state).put_calls
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_object(&self, request: PutObjectRequest) -> StoreResult<ObjectAck> {
        {
            let mut state = lock(&self.state);
            state.put_calls += 1;
            if state.transient_failures > 0 {
                state.transient_failures -= 1;
                return Err(StoreError::Unavailable {
                    operation: "put_object",
                    source: outage("put_object"),
                });
            }
            if let Some(reason) = state.rejection.clone() {
                return Err(StoreError::Rejected {
                    operation: "put_object",
                    reason,
                });
            }
        }

        let bytes = std::fs::read(&request.source).map_err(|source| StoreError::Source {
            operation: "put_object",
            source,
        })?;
        if u64::try_from(bytes.len()).ok() != Some(request.content_length) {
            return Err(StoreError::Rejected {
                operation: "put_object",
                reason: "content length mismatch".into(),
            });
        }

        let e_tag = format!("\"{}\"", request.digest);
        lock(&self.state).objects.insert(
            (request.bucket, request.key),
            StoredObject {
                bytes,
                digest: request.digest,
            },
        );
        Ok(ObjectAck { e_tag: Some(e_tag) })
    }
}

/// Number of calls observed per remote log operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCalls {
    /// `ensure_group` calls.
    pub ensure_group: usize,
    /// `ensure_stream` calls.
    pub ensure_stream: usize,
    /// `next_token` calls.
    pub next_token: usize,
    /// `put_events` calls.
    pub put_events: usize,
}

#[derive(Default)]
struct StreamState {
    sequence: u64,
    events: Vec<LogEvent>,
}

impl StreamState {
    fn token(&self) -> Option<SequenceToken> {
        (self.sequence > 0).then(|| SequenceToken::new(self.sequence.to_string()))
    }
}

#[derive(Default)]
struct LogState {
    groups: BTreeMap<String, BTreeMap<String, StreamState>>,
    calls: LogCalls,
    transient_failures: usize,
    unavailable: bool,
    pending_races: usize,
    fetch_log: Vec<Option<SequenceToken>>,
}

impl LogState {
    fn check_outage(&mut self, operation: &'static str) -> LogResult<()> {
        if self.unavailable {
            return Err(LogError::Unavailable {
                operation,
                source: outage(operation),
            });
        }
        if self.transient_failures > 0 {
            self.transient_failures -= 1;
            return Err(LogError::Unavailable {
                operation,
                source: outage(operation),
            });
        }
        Ok(())
    }

    fn stream_mut(&mut self, group: &str, stream: &str) -> LogResult<&mut StreamState> {
        self.groups
            .get_mut(group)
            .ok_or_else(|| LogError::NotFound {
                resource: "group",
                name: group.to_string(),
            })?
            .get_mut(stream)
            .ok_or_else(|| LogError::NotFound {
                resource: "stream",
                name: stream.to_string(),
            })
    }
}

/// Sequenced log service held in memory.
///
/// Tokens are the decimal count of accepted puts; a stream that has never
/// been written has no token. A put must carry exactly the current token.
#[derive(Clone, Default)]
pub struct InMemoryRemoteLog {
    state: Arc<Mutex<LogState>>,
}

impl InMemoryRemoteLog {
    /// Create an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create `group`/`stream` as if another process had set them up.
    pub fn create_existing(&self, group: &str, stream: &str) {
        lock(&self.state)
            .groups
            .entry(group.to_string())
            .or_default()
            .entry(stream.to_string())
            .or_default();
    }

    /// Simulate an unrelated writer appending to `stream`, invalidating any
    /// token fetched before this call.
    pub fn advance_token(&self, group: &str, stream: &str) {
        let mut state = lock(&self.state);
        if let Ok(entry) = state.stream_mut(group, stream) {
            entry.sequence += 1;
            entry.events.push(LogEvent {
                timestamp_ms: 0,
                message: "external writer".into(),
            });
        }
    }

    /// Let the next `next_token` call return the current token and then
    /// advance the stream, so the caller's put carries a stale token.
    pub fn race_next_fetch(&self) {
        lock(&self.state).pending_races += 1;
    }

    /// Fail the next `count` calls of any operation with a transient outage.
    pub fn fail_next(&self, count: usize) {
        lock(&self.state).transient_failures = count;
    }

    /// Toggle a permanent outage for every operation.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    /// Calls observed so far.
    #[must_use]
    pub fn calls(&self) -> LogCalls {
        lock(&self.state).calls
    }

    /// Tokens handed out by `next_token`, in call order.
    #[must_use]
    pub fn fetched_tokens(&self) -> Vec<Option<SequenceToken>> {
        lock(&self.state).fetch_log.clone()
    }

    /// Events accepted on `group`/`stream`, in append order.
    #[must_use]
    pub fn events(&self, group: &str, stream: &str) -> Vec<LogEvent> {
        lock(&self.state)
            .groups
            .get(group)
            .and_then(|streams| streams.get(stream))
            .map(|entry| entry.events.clone())
            .unwrap_or_default()
    }

    /// Messages accepted on `group`/`stream` written by the pipeline.
    #[must_use]
    pub fn messages(&self, group: &str, stream: &str) -> Vec<String> {
        self.events(group, stream)
            .into_iter()
            .filter(|event| event.message != "external writer")
            .map(|event| event.message)
            .collect()
    }
}

#[async_trait]
impl RemoteLog for InMemoryRemoteLog {
    async fn ensure_group(&self, group: &str) -> LogResult<()> {
        let mut state = lock(&self.state);
        state.calls.ensure_group += 1;
        state.check_outage("ensure_group")?;
        if state.groups.contains_key(group) {
            return Err(LogError::AlreadyExists {
                resource: "group",
                name: group.to_string(),
            });
        }
        state.groups.insert(group.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn ensure_stream(&self, group: &str, stream: &str) -> LogResult<()> {
        let mut state = lock(&self.state);
        state.calls.ensure_stream += 1;
        state.check_outage("ensure_stream")?;
        let streams = state
            .groups
            .get_mut(group)
            .ok_or_else(|| LogError::NotFound {
                resource: "group",
                name: group.to_string(),
            })?;
        if streams.contains_key(stream) {
            return Err(LogError::AlreadyExists {
                resource: "stream",
                name: stream.to_string(),
            });
        }
        streams.insert(stream.to_string(), StreamState::default());
        Ok(())
    }

    async fn next_token(
        &self,
        group: &str,
        stream_prefix: &str,
    ) -> LogResult<Option<SequenceToken>> {
        let mut state = lock(&self.state);
        state.calls.next_token += 1;
        state.check_outage("next_token")?;
        let race = state.pending_races > 0;
        if race {
            state.pending_races -= 1;
        }
        let streams = state
            .groups
            .get_mut(group)
            .ok_or_else(|| LogError::NotFound {
                resource: "group",
                name: group.to_string(),
            })?;
        let entry = streams
            .iter_mut()
            .find(|(name, _)| name.starts_with(stream_prefix))
            .map(|(_, entry)| entry)
            .ok_or_else(|| LogError::NotFound {
                resource: "stream",
                name: stream_prefix.to_string(),
            })?;
        let token = entry.token();
        if race {
            entry.sequence += 1;
            entry.events.push(LogEvent {
                timestamp_ms: 0,
                message: "external writer".into(),
            });
        }
        state.fetch_log.push(token.clone());
        Ok(token)
    }

    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        token: Option<SequenceToken>,
        events: Vec<LogEvent>,
    ) -> LogResult<PutEventsAck> {
        let mut state = lock(&self.state);
        state.calls.put_events += 1;
        state.check_outage("put_events")?;
        let entry = state.stream_mut(group, stream)?;
        let expected = entry.token();
        if token != expected {
            return Err(LogError::InvalidSequenceToken {
                stream: stream.to_string(),
                expected: expected.map(|value| value.as_str().to_string()),
            });
        }
        entry.sequence += 1;
        entry.events.extend(events);
        Ok(PutEventsAck {
            next_sequence_token: entry.token(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remote_log_enforces_current_token() -> anyhow::Result<()> {
        let log = InMemoryRemoteLog::new();
        log.ensure_group("g").await?;
        log.ensure_stream("g", "s").await?;
        assert!(log.ensure_group("g").await.is_err_and(|err| err.is_already_exists()));

        let first = log.next_token("g", "s").await?;
        assert_eq!(first, None);
        log.put_events("g", "s", first, vec![LogEvent {
            timestamp_ms: 1,
            message: "one".into(),
        }])
        .await?;

        let stale = log
            .put_events("g", "s", None, Vec::new())
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected stale token rejection"))?;
        assert!(matches!(stale, LogError::InvalidSequenceToken { .. }));

        let fresh = log.next_token("g", "s").await?;
        assert_eq!(fresh, Some(SequenceToken::new("1")));
        assert_eq!(log.calls().put_events, 2);
        Ok(())
    }

    #[tokio::test]
    async fn blob_store_injects_transient_failures() -> anyhow::Result<()> {
        let temp = crate::fixtures::temp_dir("rawvault-mocks-")?;
        let path = crate::fixtures::write_file(&temp.path().join("a.raw"), b"abc")?;
        let store = InMemoryBlobStore::new();
        store.fail_next(1);
        let request = PutObjectRequest {
            bucket: "b1".into(),
            key: "a.raw/a.raw".into(),
            source: path,
            content_length: 3,
            digest: ContentDigest::from_hex("00"),
        };
        let first = store.put_object(request.clone()).await;
        assert!(first.is_err_and(|err| err.is_transient()));
        let ack = store.put_object(request).await?;
        assert!(ack.e_tag.is_some());
        assert_eq!(store.keys("b1"), vec!["a.raw/a.raw".to_string()]);
        assert_eq!(store.put_calls(), 2);
        Ok(())
    }
}
