//! Integrity check for the serialized model artifact.
//!
//! When `MODEL_SHA256` is configured the bytes on disk must hash to that
//! digest before they are parsed.

use sha2::{Digest, Sha256};

use crate::errors::ClassifierError;

/// Computes the hex-encoded SHA-256 digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Verifies `bytes` against an expected hex digest (case-insensitive).
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<(), ClassifierError> {
    let expected = expected.trim().to_ascii_lowercase();
    if expected.len() != 64 || hex::decode(&expected).is_err() {
        return Err(ClassifierError::Artifact(format!(
            "expected checksum is not a SHA-256 hex digest: '{}'",
            expected
        )));
    }

    let computed = sha256_hex(bytes);
    if computed != expected {
        tracing::warn!(
            "Model checksum mismatch. Expected: {}, computed: {}, size: {} bytes",
            expected,
            computed,
            bytes.len()
        );
        return Err(ClassifierError::Artifact(
            "model checksum mismatch".to_string(),
        ));
    }

    tracing::debug!("Model checksum verified: {}", computed);
    Ok(())
}
