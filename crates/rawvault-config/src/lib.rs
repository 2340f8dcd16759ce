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

//! Invocation configuration for a single instrument transfer.
//!
//! Layout: `model.rs` (instrument and destination variants, validated
//! `TransferConfig`), `validate.rs` (raw `TransferSettings` and its
//! validation), `loader.rs` (environment and JSON sources), `defaults.rs`
//! (fallback names applied by the loaders only).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ENV_PREFIX;
pub use model::{DestinationKind, DestinationSpec, InstrumentKind, TransferConfig};
pub use validate::TransferSettings;
