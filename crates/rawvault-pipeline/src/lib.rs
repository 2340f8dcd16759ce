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

//! Transfer-and-verify pipeline for instrument acquisitions.
//!
//! Layout: `checksum.rs` (streaming digests), `unit.rs` (the file moved by a
//! run), `packager.rs` (unit selection and zip packaging), `router.rs`
//! (prefix-based containers), `executor.rs` (copy or upload with integrity
//! evidence), `service.rs` (`TransferService` orchestrating a run),
//! `error.rs` (pipeline failures).

pub mod checksum;
pub mod error;
pub mod executor;
pub mod packager;
pub mod router;
pub mod service;
pub mod unit;

pub use error::{PackagingCause, PipelineError, PipelineResult, TransferCause};
pub use executor::{TransferExecutor, TransferOutcome, Verification};
pub use router::{ContainerHandle, PrefixKey};
pub use service::{TransferReport, TransferService};
pub use unit::{TransferUnit, UnitOrigin};
