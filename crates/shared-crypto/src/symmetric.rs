//! # Symmetric Envelope Encryption
//!
//! Provides AES-256-CBC encryption under a per-message key derived from a
//! shared secret with PBKDF2-HMAC-SHA1.
//!
//! ## Security Properties
//!
//! - **Fresh salt and IV per message**: encrypting the same plaintext twice
//!   yields different `salt`, `iv` and `ciphertext`.
//! - **Padding is checked**: a wrong secret or tampered bytes surface as
//!   `CryptoError::DecryptionFailed` rather than garbage plaintext in the
//!   overwhelming majority of cases (CBC carries no MAC).

use crate::CryptoError;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha1::Sha1;
use shared_types::{Envelope, EventType};
use std::fmt;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// PBKDF2 iteration count.
pub const KDF_ITERATIONS: u32 = 20_000;

/// Derived key length (AES-256).
pub const KEY_LEN: usize = 32;

/// Salt length.
pub const SALT_LEN: usize = 16;

/// AES block / IV length.
pub const IV_LEN: usize = 16;

/// Shared secret from which every envelope key is derived.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PipelineSecret(Vec<u8>);

impl PipelineSecret {
    /// Create from raw bytes.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PipelineSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PipelineSecret(<redacted>)")
    }
}

/// Per-message AES key.
#[derive(Zeroize, ZeroizeOnDrop)]
struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    fn derive(secret: &PipelineSecret, salt: &[u8]) -> Self {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha1>(secret.as_bytes(), salt, KDF_ITERATIONS, &mut key);
        Self(key)
    }
}

/// Routing metadata stamped onto an envelope at encryption time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptOptions {
    /// Destination topic.
    pub topic: String,
    /// Payload schema type, e.g. `Order_1_1`.
    pub type_info: String,
    /// Change kind.
    pub event_type: EventType,
    /// Optional owning principal.
    pub owner_info: Option<String>,
}

impl EncryptOptions {
    /// Options without owner information.
    pub fn new(
        topic: impl Into<String>,
        type_info: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        Self {
            topic: topic.into(),
            type_info: type_info.into(),
            event_type,
            owner_info: None,
        }
    }

    /// Attach owner information.
    pub fn with_owner(mut self, owner_info: impl Into<String>) -> Self {
        self.owner_info = Some(owner_info.into());
        self
    }
}

/// Envelope encryption capability.
///
/// Emitters and subscribers hold an `Encryptor` by composition.
pub trait Encryptor: Send + Sync {
    /// Encrypt `plaintext` into a fresh envelope.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EncryptionFailed` if the cipher cannot be set up.
    fn encrypt(&self, plaintext: &[u8], options: &EncryptOptions) -> Result<Envelope, CryptoError>;

    /// Decrypt an envelope back into its plaintext bytes.
    ///
    /// CBC carries no MAC, so a wrong secret or corrupted bytes are caught
    /// only by the PKCS#7 padding check. A damaged final block still passes
    /// that check about once in 256 attempts and decrypts to garbage, which
    /// payload parsing then rejects.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::DecryptionFailed` for a wrong secret, corrupted
    /// bytes or a padding mismatch.
    fn decrypt(&self, envelope: &Envelope) -> Result<Vec<u8>, CryptoError>;
}

/// AES-256-CBC envelope encryptor with a process-wide shared secret.
#[derive(Clone)]
pub struct SymmetricEncryptor {
    secret: PipelineSecret,
    api_key: String,
}

impl SymmetricEncryptor {
    /// Environment variable holding the shared secret.
    pub const SECRET_ENV: &'static str = "PIPELINE_SECRET";

    /// Environment variable holding the API key stamped on emitted envelopes.
    pub const API_KEY_ENV: &'static str = "PIPELINE_API_KEY";

    /// Create an encryptor with an injected secret and no API key.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::MissingSecret` if the secret is empty.
    pub fn with_secret(secret: PipelineSecret) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::MissingSecret);
        }
        Ok(Self {
            secret,
            api_key: String::new(),
        })
    }

    /// Resolve the secret and API key from the environment.
    ///
    /// Read once at startup; the encryptor is then shared.
    pub fn from_env() -> Result<Self, CryptoError> {
        let secret = std::env::var(Self::SECRET_ENV).map_err(|_| CryptoError::MissingSecret)?;
        let encryptor = Self::with_secret(PipelineSecret::new(secret))?;
        Ok(encryptor.with_api_key(std::env::var(Self::API_KEY_ENV).unwrap_or_default()))
    }

    /// Set the API key stamped onto every envelope.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// API key stamped onto every envelope.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn random_bytes<const N: usize>() -> [u8; N] {
        let mut bytes = [0u8; N];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }
}

impl fmt::Debug for SymmetricEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricEncryptor")
            .field("secret", &self.secret)
            .field("api_key_set", &!self.api_key.is_empty())
            .finish()
    }
}

impl Encryptor for SymmetricEncryptor {
    fn encrypt(&self, plaintext: &[u8], options: &EncryptOptions) -> Result<Envelope, CryptoError> {
        let salt = Self::random_bytes::<SALT_LEN>();
        let iv = Self::random_bytes::<IV_LEN>();
        let key = DerivedKey::derive(&self.secret, &salt);

        let ciphertext = Aes256CbcEnc::new_from_slices(&key.0, &iv)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        Ok(Envelope {
            uuid: Uuid::new_v4().to_string(),
            salt: salt.to_vec(),
            iv: iv.to_vec(),
            ciphertext,
            owner_info: options.owner_info.clone(),
            type_info: options.type_info.clone(),
            topic: options.topic.clone(),
            event_type: options.event_type,
            api_key: self.api_key.clone(),
        })
    }

    fn decrypt(&self, envelope: &Envelope) -> Result<Vec<u8>, CryptoError> {
        if envelope.iv.len() != IV_LEN {
            return Err(CryptoError::InvalidIvLength {
                expected: IV_LEN,
                actual: envelope.iv.len(),
            });
        }
        let key = DerivedKey::derive(&self.secret, &envelope.salt);

        Aes256CbcDec::new_from_slices(&key.0, &envelope.iv)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(&envelope.ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}
