//! SHA-256 fingerprint for ledger content-drift detection.

use sha2::{Digest, Sha256};

/// Compute a 64-bit fingerprint of `text`.
///
/// The first eight bytes of the SHA-256 digest, read big-endian. Stored in
/// the ledger's `BIGINT` `query_hash` column.
pub fn fingerprint(text: &str) -> i64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(head)
}
