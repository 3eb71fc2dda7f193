//! Content hashing for duplicate detection.
//!
//! Uses BLAKE3, streamed, so large files never sit in memory whole.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::types::ContentHash;

const BUFFER_SIZE: usize = 64 * 1024;

/// Computes the content identity of a file.
///
/// Implementations must be deterministic: identical bytes, identical hash.
pub trait HashProvider: Sync {
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    fn hash(&self, path: &Path) -> io::Result<ContentHash>;
}

/// The default provider: BLAKE3 over the full file contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl HashProvider for Blake3Hasher {
    fn hash(&self, path: &Path) -> io::Result<ContentHash> {
        hash_file(path)
    }
}

/// Compute the BLAKE3 hash of a file's contents.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();

    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentHash(*hasher.finalize().as_bytes()))
}

// ============================================================================
// TESTS
// ============================================================================
