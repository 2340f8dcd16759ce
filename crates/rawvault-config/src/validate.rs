//! Raw invocation settings and their validation into a [`TransferConfig`].
//!
//! # Design
//! - Settings hold untyped optional strings exactly as the caller supplied them.
//! - Validation fails fast on the first missing or malformed field.
//! - Validation never fills a value in; defaults belong to the loaders.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{DestinationKind, DestinationSpec, InstrumentKind, TransferConfig};

/// Unvalidated invocation parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferSettings {
    /// Instrument family name (`Bruker`, `Sciex`, `Thermo`).
    pub instrument: Option<String>,
    /// Source file or acquisition folder.
    pub source: Option<String>,
    /// Destination kind (`S3` or `Directory`).
    pub destination: Option<String>,
    /// Bucket for the object-store destination.
    pub bucket: Option<String>,
    /// Archive root for the directory destination.
    pub directory: Option<String>,
    /// Remote log group for the object-store destination.
    pub log_group: Option<String>,
    /// Remote log stream for the object-store destination.
    pub log_stream: Option<String>,
    /// Local audit file path.
    pub audit_log: Option<String>,
    /// Directory for temporary archives.
    pub staging_dir: Option<String>,
}

impl TransferSettings {
    /// Validate the settings into an immutable configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a field required by the
    /// chosen destination is absent and [`ConfigError::InvalidField`] when a
    /// value is blank or cannot be parsed.
    pub fn validate(&self) -> ConfigResult<TransferConfig> {
        let instrument: InstrumentKind = required("instrument", self.instrument.as_deref())?.parse()?;
        let source = PathBuf::from(required("source", self.source.as_deref())?);
        let kind: DestinationKind = required("destination", self.destination.as_deref())?.parse()?;

        let destination = match kind {
            DestinationKind::ObjectStore => DestinationSpec::ObjectStore {
                bucket: required("bucket", self.bucket.as_deref())?.to_string(),
                log_group: required("log_group", self.log_group.as_deref())?.to_string(),
                log_stream: required("log_stream", self.log_stream.as_deref())?.to_string(),
            },
            DestinationKind::Directory => DestinationSpec::Directory {
                root: PathBuf::from(required("directory", self.directory.as_deref())?),
            },
        };

        let audit_log = PathBuf::from(required("audit_log", self.audit_log.as_deref())?);
        let staging_dir = optional("staging_dir", self.staging_dir.as_deref())?.map(PathBuf::from);

        Ok(TransferConfig {
            instrument,
            source,
            destination,
            audit_log,
            staging_dir,
        })
    }
}

fn required<'a>(field: &'static str, value: Option<&'a str>) -> ConfigResult<&'a str> {
    optional(field, value)?.ok_or(ConfigError::MissingField { field })
}

fn optional<'a>(field: &'static str, value: Option<&'a str>) -> ConfigResult<Option<&'a str>> {
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Err(ConfigError::invalid(field, raw, "blank")),
        Some(raw) => Ok(Some(raw.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn remote_settings() -> TransferSettings {
        TransferSettings {
            instrument: Some("Bruker".into()),
            source: Some("/data/acq".into()),
            destination: Some("S3".into()),
            bucket: Some("b1".into()),
            log_group: Some("S3UploadLogs".into()),
            log_stream: Some("InstrumentUploads".into()),
            audit_log: Some("local_log.txt".into()),
            ..TransferSettings::default()
        }
    }

    #[test]
    fn remote_settings_validate_into_object_store_spec() -> anyhow::Result<()> {
        let config = remote_settings().validate()?;
        assert_eq!(config.instrument, InstrumentKind::Bruker);
        assert_eq!(config.source, Path::new("/data/acq"));
        assert_eq!(
            config.destination,
            DestinationSpec::ObjectStore {
                bucket: "b1".into(),
                log_group: "S3UploadLogs".into(),
                log_stream: "InstrumentUploads".into(),
            }
        );
        assert!(config.staging_dir.is_none());
        Ok(())
    }

    #[test]
    fn missing_bucket_fails_fast_for_object_store() {
        let settings = TransferSettings {
            bucket: None,
            ..remote_settings()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingField { field: "bucket" })
        ));
    }

    #[test]
    fn missing_root_fails_fast_for_directory() {
        let settings = TransferSettings {
            destination: Some("Directory".into()),
            bucket: None,
            ..remote_settings()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingField { field: "directory" })
        ));
    }

    #[test]
    fn directory_destination_ignores_remote_fields() -> anyhow::Result<()> {
        let settings = TransferSettings {
            destination: Some("directory".into()),
            directory: Some("/archive".into()),
            bucket: None,
            log_group: None,
            log_stream: None,
            ..remote_settings()
        };
        let config = settings.validate()?;
        assert_eq!(
            config.destination,
            DestinationSpec::Directory {
                root: PathBuf::from("/archive")
            }
        );
        Ok(())
    }

    #[test]
    fn validation_does_not_invent_log_names() {
        let settings = TransferSettings {
            log_stream: None,
            ..remote_settings()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingField {
                field: "log_stream"
            })
        ));
    }

    #[test]
    fn blank_values_are_invalid_not_missing() {
        let settings = TransferSettings {
            bucket: Some("   ".into()),
            ..remote_settings()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidField {
                field: "bucket",
                reason: "blank",
                ..
            })
        ));
    }

    #[test]
    fn unknown_destination_is_rejected() {
        let settings = TransferSettings {
            destination: Some("ftp".into()),
            ..remote_settings()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidField {
                field: "destination",
                ..
            })
        ));
    }
}
