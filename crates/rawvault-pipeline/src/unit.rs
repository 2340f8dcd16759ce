//! The single file moved by one pipeline run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use rawvault_core::ContentDigest;

use crate::checksum;
use crate::error::{PipelineError, PipelineResult};

/// How the transfer unit came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOrigin {
    /// The instrument's own file; never deleted by the pipeline.
    Original,
    /// An archive synthesized by the packager; removed once transferred.
    Packaged,
}

/// File selected or produced for transfer.
#[derive(Debug)]
pub struct TransferUnit {
    path: PathBuf,
    logical_name: String,
    size_bytes: u64,
    origin: UnitOrigin,
    digest: OnceCell<ContentDigest>,
}

impl TransferUnit {
    /// Use an existing regular file as the transfer unit.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] if `path` is missing or is not a
    /// regular file.
    pub fn original(path: impl Into<PathBuf>) -> PipelineResult<Self> {
        Self::from_path(path.into(), UnitOrigin::Original)
    }

    pub(crate) fn packaged(path: PathBuf) -> PipelineResult<Self> {
        Self::from_path(path, UnitOrigin::Packaged)
    }

    fn from_path(path: PathBuf, origin: UnitOrigin) -> PipelineResult<Self> {
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(PipelineError::not_found(path, "missing"));
            }
            Err(err) => return Err(PipelineError::io("unit.metadata", path, err)),
        };
        if !metadata.is_file() {
            return Err(PipelineError::not_found(path, "not_a_regular_file"));
        }
        let logical_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| PipelineError::not_found(&path, "no_file_name"))?;

        Ok(Self {
            path,
            logical_name,
            size_bytes: metadata.len(),
            origin,
            digest: OnceCell::new(),
        })
    }

    /// Absolute or caller-relative path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name used at the destination.
    #[must_use]
    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    /// Size observed when the unit was created.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Origin of the file.
    #[must_use]
    pub const fn origin(&self) -> UnitOrigin {
        self.origin
    }

    /// Whether the pipeline owns the file and may delete it.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.origin == UnitOrigin::Packaged
    }

    /// Digest of the source bytes, computed on first use and cached.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be read.
    pub fn source_digest(&self) -> PipelineResult<&ContentDigest> {
        self.digest
            .get_or_try_init(|| checksum::digest_file(&self.path))
    }

    /// Cached digest, if it has been computed.
    #[must_use]
    pub fn cached_digest(&self) -> Option<&ContentDigest> {
        self.digest.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult<T> = anyhow::Result<T>;

    #[test]
    fn original_unit_reports_name_and_size() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("GER001_A.raw");
        fs::write(&path, b"spectra")?;

        let unit = TransferUnit::original(&path)?;
        assert_eq!(unit.logical_name(), "GER001_A.raw");
        assert_eq!(unit.size_bytes(), 7);
        assert_eq!(unit.origin(), UnitOrigin::Original);
        assert!(!unit.is_temporary());
        Ok(())
    }

    #[test]
    fn digest_is_computed_once() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("RUN001.raw");
        fs::write(&path, b"before")?;

        let unit = TransferUnit::original(&path)?;
        assert!(unit.cached_digest().is_none());
        let first = unit.source_digest()?.clone();
        fs::write(&path, b"after")?;
        assert_eq!(unit.source_digest()?, &first);
        Ok(())
    }

    #[test]
    fn directories_and_missing_paths_are_not_found() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        assert!(matches!(
            TransferUnit::original(temp.path()),
            Err(PipelineError::NotFound {
                reason: "not_a_regular_file",
                ..
            })
        ));
        assert!(matches!(
            TransferUnit::original(temp.path().join("absent.raw")),
            Err(PipelineError::NotFound {
                reason: "missing",
                ..
            })
        ));
        Ok(())
    }
}
