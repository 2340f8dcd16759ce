//! Local append-only audit file.
//!
//! Each record is one line, `<ctime-style timestamp>: <message>`. The file is
//! opened in append mode for every record and is never truncated.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{AuditError, AuditResult};

const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Timestamped text file sink.
#[derive(Debug, Clone)]
pub struct LocalAuditLog {
    path: PathBuf,
}

impl LocalAuditLog {
    /// Sink writing to `path`; the file is created on first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Audit file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `message` stamped with the current local time.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::LocalSink`] if the file cannot be opened or written.
    pub fn append(&self, message: &str) -> AuditResult<()> {
        self.append_at(Local::now(), message)
    }

    /// Append `message` stamped with `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::LocalSink`] if the file cannot be opened or written.
    pub fn append_at(&self, timestamp: DateTime<Local>, message: &str) -> AuditResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| AuditError::local("local.create_parent", parent, source))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| AuditError::local("local.open", &self.path, source))?;
        file.write_all(format_record(timestamp, message).as_bytes())
            .map_err(|source| AuditError::local("local.write", &self.path, source))?;
        Ok(())
    }
}

fn format_record(timestamp: DateTime<Local>, message: &str) -> String {
    format!("{}: {message}\n", timestamp.format(TIMESTAMP_FORMAT))
}
