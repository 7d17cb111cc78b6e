//! SHA-256 hex digest of uploaded files.
//!
//! The digest travels with status records and analytics events so callers
//! can recognise a re-upload of the same bytes.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}
