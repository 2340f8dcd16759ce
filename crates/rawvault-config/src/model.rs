//! Typed configuration models for a transfer invocation.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;

/// Instrument family that produced the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    /// Bruker instruments write `.d` acquisition directories.
    Bruker,
    /// Sciex instruments write `.wiff` acquisition directories.
    Sciex,
    /// Thermo instruments write a single raw file.
    Thermo,
}

impl InstrumentKind {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bruker => "bruker",
            Self::Sciex => "sciex",
            Self::Thermo => "thermo",
        }
    }

    /// Directory extension (including the dot) that marks the acquisition
    /// directory to package, or `None` when the instrument writes a single file.
    #[must_use]
    pub const fn package_extension(self) -> Option<&'static str> {
        match self {
            Self::Bruker => Some(".d"),
            Self::Sciex => Some(".wiff"),
            Self::Thermo => None,
        }
    }

    /// Whether the transfer unit must be packaged into an archive first.
    #[must_use]
    pub const fn requires_packaging(self) -> bool {
        self.package_extension().is_some()
    }
}

impl Display for InstrumentKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for InstrumentKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bruker" => Ok(Self::Bruker),
            "sciex" => Ok(Self::Sciex),
            "thermo" => Ok(Self::Thermo),
            _ => Err(ConfigError::invalid(
                "instrument",
                value,
                "unknown_instrument",
            )),
        }
    }
}

/// Destination family selected for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    /// Object store bucket with a remote audit stream.
    ObjectStore,
    /// Local archive directory.
    Directory,
}

impl DestinationKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ObjectStore => "s3",
            Self::Directory => "directory",
        }
    }
}

impl Display for DestinationKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for DestinationKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "s3" | "object_store" => Ok(Self::ObjectStore),
            "directory" | "dir" => Ok(Self::Directory),
            _ => Err(ConfigError::invalid(
                "destination",
                value,
                "unknown_destination",
            )),
        }
    }
}

/// Where the transfer unit goes. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DestinationSpec {
    /// Upload to a bucket and mirror audit records to a remote log stream.
    ObjectStore {
        /// Target bucket.
        bucket: String,
        /// Remote log group for audit records.
        log_group: String,
        /// Remote log stream for audit records.
        log_stream: String,
    },
    /// Copy into a local archive root.
    Directory {
        /// Archive root; created when missing.
        root: PathBuf,
    },
}

impl DestinationSpec {
    /// Kind discriminant of this destination.
    #[must_use]
    pub const fn kind(&self) -> DestinationKind {
        match self {
            Self::ObjectStore { .. } => DestinationKind::ObjectStore,
            Self::Directory { .. } => DestinationKind::Directory,
        }
    }
}

/// Validated, immutable configuration for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferConfig {
    /// Instrument family of the source data.
    pub instrument: InstrumentKind,
    /// Source file or acquisition folder.
    pub source: PathBuf,
    /// Chosen destination.
    pub destination: DestinationSpec,
    /// Local append-only audit file.
    pub audit_log: PathBuf,
    /// Directory for temporary archives; the system temp dir when `None`.
    pub staging_dir: Option<PathBuf>,
}

impl TransferConfig {
    /// Staging directory for archives, falling back to the system temp dir.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Source path as configured.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }
}
