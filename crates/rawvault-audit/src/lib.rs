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

//! Append-only audit trail for instrument transfers.
//!
//! Layout: `local.rs` (timestamped text file sink), `remote.rs` (sequenced
//! remote stream sink), `logger.rs` (`AuditLogger` combining both with
//! best-effort delivery), `error.rs` (audit failures).

pub mod error;
pub mod local;
pub mod logger;
pub mod remote;

pub use error::{AuditError, AuditResult};
pub use local::LocalAuditLog;
pub use logger::{AuditDelivery, AuditLogger, AuditSink, DeliveryStatus};
pub use remote::{RemoteAuditSink, SinkState};
