//! Streaming content digests.
//!
//! SHA-256 over fixed 64 KiB chunks. Reading stops only when the reader
//! reports end-of-stream; interrupted reads are resumed, never treated as EOF.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use rawvault_core::ContentDigest;
use sha2::{Digest, Sha256};

use crate::error::{PipelineError, PipelineResult};

const CHUNK_SIZE: usize = 64 * 1024;

/// Digest the file at `path`.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be opened or read.
pub fn digest_file(path: &Path) -> PipelineResult<ContentDigest> {
    let file = File::open(path).map_err(|source| PipelineError::io("checksum.open", path, source))?;
    digest_reader(file).map_err(|source| PipelineError::io("checksum.read", path, source))
}

/// Digest everything `reader` yields until end-of-stream.
///
/// # Errors
///
/// Returns the first read error other than [`io::ErrorKind::Interrupted`].
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<ContentDigest> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0_u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => hasher.update(&buffer[..read]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(ContentDigest::from_hex(format!("{:x}", hasher.finalize())))
}
