//! Value types exchanged with the blob store and remote log collaborators.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lowercase hex content digest of a file.
///
/// Equality is the only integrity criterion; there is no partial matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Wrap an already-encoded hex digest, normalising it to lowercase.
    #[must_use]
    pub fn from_hex(value: impl Into<String>) -> Self {
        Self(value.into().to_ascii_lowercase())
    }

    /// Borrow the hex encoding.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentDigest {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Upload request handed to a [`crate::BlobStore`].
///
/// The store streams bytes from `source`; `content_length` and `digest` let a
/// real store reject a short or corrupted body.
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    /// Target bucket.
    pub bucket: String,
    /// Object key, `"<prefix>/<file name>"`.
    pub key: String,
    /// Local file holding the bytes to upload.
    pub source: PathBuf,
    /// Expected body length in bytes.
    pub content_length: u64,
    /// Digest of the body computed before upload.
    pub digest: ContentDigest,
}

/// Store acknowledgement of a completed upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectAck {
    /// Entity tag reported by the store, when it returns one.
    pub e_tag: Option<String>,
}

/// Opaque token the remote log requires to accept the next batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceToken(String);

impl SequenceToken {
    /// Wrap a token returned by the log service.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SequenceToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Single event appended to a remote log stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Event time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Free-text message.
    pub message: String,
}

/// Acknowledgement of a successful put to a remote log stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutEventsAck {
    /// Token the service will accept next, when reported.
    pub next_sequence_token: Option<SequenceToken>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_normalises_case_and_compares_exactly() {
        let upper = ContentDigest::from_hex("ABCDEF01");
        let lower = ContentDigest::from_hex("abcdef01");
        assert_eq!(upper, lower);
        assert_eq!(upper.to_string(), "abcdef01");
        assert_ne!(lower, ContentDigest::from_hex("abcdef0"));
    }

    #[test]
    fn sequence_token_displays_raw_value() {
        let token = SequenceToken::new("49590302");
        assert_eq!(token.as_str(), "49590302");
        assert_eq!(token.to_string(), "49590302");
        assert_eq!(PutEventsAck::default().next_sequence_token, None);
    }
}
