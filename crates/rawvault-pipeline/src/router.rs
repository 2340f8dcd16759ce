//! Prefix-based destination routing.
//!
//! # Design
//! - The prefix is the file name up to its first `_`; names without one route by the whole name.
//! - Object-store containers are key prefixes and need no creation call.
//! - Local containers reuse the first existing child directory (lexicographic) whose
//!   name starts with the prefix, otherwise `<root>/<prefix>` is created.
//! - An already-existing directory is a success, never an error.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rawvault_config::DestinationSpec;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Routing key derived from a transfer unit's file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefixKey(String);

impl PrefixKey {
    /// Leading token of `file_name` before its first `_`.
    ///
    /// A name without `_` routes by the whole name. A name starting with `_`
    /// has an empty leading token; rather than routing by `""`, it also
    /// routes by the whole name.
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Self {
        let prefix = match file_name.split_once('_') {
            Some((head, _)) if !head.is_empty() => head,
            _ => file_name,
        };
        Self(prefix.to_string())
    }

    /// Borrow the prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PrefixKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Resolved container at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerHandle {
    /// Object key prefix, always ending in `/`.
    KeyPrefix(String),
    /// Local directory holding every file with the same prefix.
    Directory(PathBuf),
}

/// Resolve the container for `prefix` under `destination`.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] when the local root or container cannot be
/// listed or created.
pub fn resolve_container(
    destination: &DestinationSpec,
    prefix: &PrefixKey,
) -> PipelineResult<ContainerHandle> {
    match destination {
        DestinationSpec::ObjectStore { .. } => Ok(ContainerHandle::KeyPrefix(format!("{prefix}/"))),
        DestinationSpec::Directory { root } => {
            resolve_local_container(root, prefix).map(ContainerHandle::Directory)
        }
    }
}

fn resolve_local_container(root: &Path, prefix: &PrefixKey) -> PipelineResult<PathBuf> {
    fs::create_dir_all(root).map_err(|source| PipelineError::io("route.create_root", root, source))?;

    let entries = fs::read_dir(root).map_err(|source| PipelineError::io("route.read_root", root, source))?;
    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| PipelineError::io("route.read_entry", root, source))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix.as_str()) && entry.path().is_dir() {
            candidates.push(name);
        }
    }
    candidates.sort();

    if let Some(existing) = candidates.first() {
        debug!(prefix = %prefix, container = %existing, "reusing existing container");
        return Ok(root.join(existing));
    }

    let container = root.join(prefix.as_str());
    match fs::create_dir(&container) {
        Ok(()) => {
            debug!(prefix = %prefix, container = %container.display(), "created container");
            Ok(container)
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && container.is_dir() => Ok(container),
        Err(err) => Err(PipelineError::io("route.create_container", container, err)),
    }
}
