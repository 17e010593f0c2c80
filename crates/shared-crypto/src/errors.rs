//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (wrong secret, corrupted bytes or bad padding)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid initialization vector length
    #[error("Invalid IV length: expected {expected}, got {actual}")]
    InvalidIvLength {
        /// Expected IV length in bytes
        expected: usize,
        /// Actual IV length in bytes
        actual: usize,
    },

    /// No shared secret was configured
    #[error("Pipeline secret is not configured")]
    MissingSecret,
}
