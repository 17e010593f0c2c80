//! # Shared Crypto - Envelope Encryption
//!
//! **Status:** Wire-compatible with existing deployments
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | AES-256-CBC, PBKDF2-HMAC-SHA1 | Envelope payload encryption |
//!
//! ## Protocol
//!
//! ```text
//! salt   = random 16 bytes
//! key    = PBKDF2-HMAC-SHA1(secret, salt, 20_000 iterations, 32 bytes)
//! iv     = random 16 bytes
//! cipher = AES-256-CBC(key, iv, PKCS#7(plaintext))
//! ```
//!
//! The API key stamped on each envelope is an application credential and is
//! not part of the key material.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use symmetric::{EncryptOptions, Encryptor, PipelineSecret, SymmetricEncryptor};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
