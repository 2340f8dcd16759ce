#![forbid(unsafe_code)]
#![deny(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Collaborator interfaces shared by the rawvault transfer pipeline.
//!
//! Layout: `error.rs` (failure taxonomy and collaborator errors), `model.rs`
//! (digests, upload requests, log events), `service.rs` (`BlobStore` and
//! `RemoteLog` capability traits), `retry.rs` (bounded backoff for transient
//! collaborator failures).

pub mod error;
pub mod model;
pub mod retry;
pub mod service;

pub use error::{FailureKind, describe_chain, LogError, LogResult, StoreError, StoreResult};
pub use model::{ContentDigest, LogEvent, ObjectAck, PutEventsAck, PutObjectRequest, SequenceToken};
pub use retry::{RetryPolicy, Retryable};
pub use service::{BlobStore, RemoteLog};
