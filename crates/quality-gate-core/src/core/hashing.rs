// crates/quality-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Quality Gate Hashing
// Description: Content integrity digests and canonical JSON hashing.
// Purpose: Provide stable SHA-256 digests for version content and config snapshots.
// Dependencies: serde, serde_jcs, serde_json, sha2
// ============================================================================

//! ## Overview
//! Version rows carry a SHA-256 digest over their content bytes, and
//! evaluation runs snapshot their scorer configuration as canonical JSON so
//! the stored hash is independent of map iteration order. Digests are hex
//! encoded lowercase and compared as strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Algorithm
// ============================================================================

/// Hash algorithm used by the engine.
///
/// # Invariants
/// - Labels are stable for persistence and replay verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

/// Default hash algorithm for all new digests.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

impl HashAlgorithm {
    /// Returns the stable persistence label for the algorithm.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

// ============================================================================
// SECTION: Digest
// ============================================================================

/// Hash digest with its producing algorithm.
///
/// # Invariants
/// - `value` is lowercase hex of the digest bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm that produced the digest.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest value.
    pub value: String,
}

/// Hashing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HashingError {
    /// Canonical JSON serialization failed.
    #[error("canonical json serialization failed: {0}")]
    Canonicalize(String),
}

// ============================================================================
// SECTION: Hash Functions
// ============================================================================

/// Hashes raw bytes with the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest {
                algorithm,
                value: hex_encode(&digest),
            }
        }
    }
}

/// Serializes a JSON value into canonical (JCS) bytes.
///
/// # Errors
///
/// Returns [`HashingError`] when the value cannot be canonicalized.
pub fn canonical_json_bytes(value: &Value) -> Result<Vec<u8>, HashingError> {
    serde_jcs::to_vec(value).map_err(|err| HashingError::Canonicalize(err.to_string()))
}

/// Hashes a JSON value over its canonical byte form.
///
/// # Errors
///
/// Returns [`HashingError`] when the value cannot be canonicalized.
pub fn hash_canonical_json(
    algorithm: HashAlgorithm,
    value: &Value,
) -> Result<HashDigest, HashingError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Encodes bytes as lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing into a String cannot fail; ignore the fmt plumbing result.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use serde_json::json;

    use super::DEFAULT_HASH_ALGORITHM;
    use super::hash_bytes;
    use super::hash_canonical_json;

    #[test]
    fn sha256_digest_matches_known_vector() {
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, b"abc");
        assert_eq!(
            digest.value,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn canonical_hash_ignores_key_order() {
        let left = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let right = json!({"a": {"c": 3, "d": 2}, "b": 1});
        let left_digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &left).unwrap();
        let right_digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &right).unwrap();
        assert_eq!(left_digest, right_digest);
    }
}
