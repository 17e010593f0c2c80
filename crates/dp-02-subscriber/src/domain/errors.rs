//! Subscriber error types.

use shared_bus::PushBodyError;
use shared_crypto::CryptoError;
use shared_types::EnvelopeError;
use thiserror::Error;

/// Failures surfaced to the caller of `handle_envelope`.
///
/// Unknown or unclaimed messages are not errors; see
/// [`super::DispatchOutcome::Dropped`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The envelope carries no API key.
    #[error("Envelope has no API key")]
    NoApiKey,

    /// The envelope's API key is not in the accepted set.
    #[error("Envelope API key is not accepted")]
    WrongApiKey,

    /// The envelope could not be decrypted.
    #[error("Decryption failed: {0}")]
    Decryption(#[from] CryptoError),

    /// Raw bytes did not decode into an envelope.
    #[error("Invalid envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    /// A push-queue request body carried no envelope bytes.
    #[error("Invalid push body: {0}")]
    PushBody(#[from] PushBodyError),

    /// The plaintext did not parse as the resolved schema.
    #[error("Failed to parse {type_info}: {reason}")]
    Parse { type_info: String, reason: String },

    /// A handler failed in a way that must reach the caller.
    #[error("Handler failed: {0}")]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    /// True for the two API-key failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::NoApiKey | Self::WrongApiKey)
    }
}

/// Failures raised by payload handlers and record stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The record to act on does not exist.
    #[error("{table} record {id} not found")]
    NotFound { table: String, id: String },

    /// The payload cannot be applied (missing id, wrong shape).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl HandlerError {
    /// Whether the dispatcher passes this error to its caller instead of
    /// logging it and moving on.
    ///
    /// Only not-found propagates; handlers raise it for delete-of-missing.
    pub fn propagates(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A payload parser failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors() {
        assert!(DispatchError::NoApiKey.is_auth());
        assert!(DispatchError::WrongApiKey.is_auth());
        assert!(!DispatchError::Decryption(CryptoError::MissingSecret).is_auth());
    }

    #[test]
    fn test_only_not_found_propagates() {
        assert!(HandlerError::NotFound {
            table: "orders".to_string(),
            id: "1".to_string()
        }
        .propagates());
        assert!(!HandlerError::InvalidState("no id".to_string()).propagates());
        assert!(!HandlerError::Store("down".to_string()).propagates());
    }
}
