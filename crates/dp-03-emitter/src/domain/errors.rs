//! Emitter error types.

use shared_bus::PublishError;
use shared_crypto::CryptoError;
use shared_types::EnvelopeError;
use thiserror::Error;

/// Why an emit failed.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The payload could not be encrypted.
    #[error("Encryption failed: {0}")]
    Crypto(#[from] CryptoError),

    /// The envelope could not be serialized.
    #[error("Envelope encoding failed: {0}")]
    Envelope(#[from] EnvelopeError),

    /// The model could not render a payload.
    #[error("Payload for {type_info} could not be rendered: {reason}")]
    Render { type_info: String, reason: String },

    /// The transport refused the envelope.
    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),
}
