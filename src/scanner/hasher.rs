//! BLAKE3 file hasher with streaming support.
//!
//! Files are read through a fixed-size buffer, so memory use does not grow
//! with file size. Digests are rendered as 64 lowercase hex characters,
//! which is the format stored in the inventory.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use super::HashError;

/// Length of a rendered digest.
pub const DIGEST_HEX_LEN: usize = 64;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Digest of one file together with the bytes actually read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOutput {
    /// Lowercase hex BLAKE3 digest
    pub digest: String,
    /// Bytes read while hashing (the size at hash time)
    pub bytes: u64,
}

/// Streaming content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with a 64 KiB read buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Create a hasher with a custom read buffer size.
    #[must_use]
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Hash the full content of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn hash_file(&self, path: &Path) -> Result<HashOutput, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path.to_path_buf(), e))?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.buffer_size];
        let mut bytes = 0u64;

        loop {
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path.to_path_buf(), e)),
            };
            hasher.update(&buffer[..n]);
            bytes += n as u64;
        }

        Ok(HashOutput {
            digest: hasher.finalize().to_hex().to_string(),
            bytes,
        })
    }
}

/// Digest of an in-memory byte slice, in the stored format.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Whether `s` has the stored digest format.
#[must_use]
pub fn is_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
