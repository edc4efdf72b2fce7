//! Content fingerprinting for raw image bytes

use sha2::{Digest, Sha256};

use crate::models::ContentFingerprint;

/// Deterministic SHA-256 fingerprint of `bytes`.
///
/// No salt and no process state: identical bytes always map to the same
/// fingerprint, across restarts, so it can key durable records.
pub fn fingerprint(bytes: &[u8]) -> ContentFingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentFingerprint::from_hex(hex::encode(hasher.finalize()))
}
