//! Crate-wide error taxonomy.

use thiserror::Error;

use crate::crypto::KeyId;

/// Errors surfaced by the security pipeline.
///
/// Detection and tracking failures never reach this type: malformed scan
/// input degrades to "no matches". Crypto and rate-limit failures propagate.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Input could not be interpreted as the expected structure.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// No key with this id is registered (retired or never existed).
    #[error("encryption key {0} not found")]
    KeyNotFound(KeyId),

    /// AEAD authentication failed: wrong key or tampered ciphertext.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Ciphertext string did not match the `v1:<key>:<nonce>:<payload>` form.
    #[error("invalid ciphertext encoding: {0}")]
    InvalidCiphertext(String),

    /// A named action exceeded its configured rate limit.
    #[error("rate limit exceeded for action `{action}`")]
    RateLimitExceeded {
        action: String,
        retry_after_secs: u64,
    },
}
