//! Content hashing for manifest file entries using BLAKE3

use crate::error::StorageError;
use crate::types::{ContentHash, Hash};
use blake3::Hasher;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read buffer size for streaming file digests.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Compute content hash for file bytes
///
/// Uses BLAKE3 to hash file content deterministically.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    ContentHash(compute_hash(content))
}

/// Compute a generic hash of arbitrary data
pub fn compute_hash(data: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Stream a file from disk through BLAKE3.
///
/// Opening the file is a filesystem failure; a read failure after a successful
/// open is a hash computation failure.
pub fn hash_file(path: &Path) -> Result<ContentHash, StorageError> {
    let mut file = File::open(path).map_err(|e| StorageError::fs(path, e))?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(StorageError::HashComputation {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        hasher.update(&buffer[..read]);
    }

    Ok(ContentHash(*hasher.finalize().as_bytes()))
}
