//! Content hashing
//!
//! SHA-256 over the raw document bytes, rendered as lowercase hex. The server
//! computes the same digest over its canonical copy, so equal content always
//! produces equal hashes regardless of which side computed them.

use scribesync_core::domain::newtypes::ContentHash;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of the given content as lowercase hex
pub fn hash_content(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    // 64 lowercase hex chars by construction
    ContentHash::new(hex).expect("sha256 hex digest is always a valid content hash")
}
