// hasher.rs — SHA-256 hashing utilities.
//
// All hashes in Preflight are SHA-256, hex-encoded. Audit identifiers are
// the first 8 hex characters of the digest: short enough for humans to
// correlate log lines, unique with high probability given a sub-second
// timestamp in the input. A collision is acceptable, not an error — these
// are index keys, not security tokens.

use sha2::{Digest, Sha256};

/// Length of an audit identifier in hex characters.
pub const AUDIT_ID_LEN: usize = 8;

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
///
/// This is deterministic: the same input always produces the same output.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    // `format!("{:x}", ...)` produces lowercase hex
    format!("{:x}", result)
}

/// Hash a UTF-8 string, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Derive a short audit identifier: the first [`AUDIT_ID_LEN`] hex characters
/// of the SHA-256 digest of `input`.
///
/// Callers compose `input` from the agent identity, the action text, and a
/// timestamp with sub-second resolution so repeated calls diverge.
pub fn short_digest(input: &str) -> String {
    let mut digest = hash_str(input);
    digest.truncate(AUDIT_ID_LEN);
    digest
}
