//! Capability traits for the network collaborators the pipeline depends on.
//!
//! Concrete object-store and log-service clients live outside this workspace;
//! the pipeline only ever sees these traits.

use async_trait::async_trait;

use crate::error::{LogResult, StoreResult};
use crate::model::{LogEvent, ObjectAck, PutEventsAck, PutObjectRequest, SequenceToken};

/// Object store that accepts whole-file uploads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload the file described by `request`.
    ///
    /// A returned [`ObjectAck`] is the only integrity evidence the pipeline
    /// records for the object-store destination.
    async fn put_object(&self, request: PutObjectRequest) -> StoreResult<ObjectAck>;
}

/// Append-only log service whose streams are sequenced by an opaque token.
#[async_trait]
pub trait RemoteLog: Send + Sync {
    /// Create a log group. An existing group is reported as
    /// [`crate::LogError::AlreadyExists`].
    async fn ensure_group(&self, group: &str) -> LogResult<()>;

    /// Create a stream inside `group`. An existing stream is reported as
    /// [`crate::LogError::AlreadyExists`].
    async fn ensure_stream(&self, group: &str, stream: &str) -> LogResult<()>;

    /// Fetch the token that the next put to the first stream matching
    /// `stream_prefix` must carry. `None` means the stream has never been
    /// written.
    async fn next_token(
        &self,
        group: &str,
        stream_prefix: &str,
    ) -> LogResult<Option<SequenceToken>>;

    /// Append `events` to `stream` using `token` for sequencing.
    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        token: Option<SequenceToken>,
        events: Vec<LogEvent>,
    ) -> LogResult<PutEventsAck>;
}
