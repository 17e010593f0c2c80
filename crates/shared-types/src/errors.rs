//! # Error Types
//!
//! Defines error types used across the pipeline crates.

use thiserror::Error;

/// Errors raised while encoding or decoding an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The bytes could not be decoded into an envelope.
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    /// The envelope could not be serialized.
    #[error("Envelope encoding failed: {0}")]
    Encoding(String),

    /// The event type code is not one of CREATED(0), UPDATED(1), DELETED(2).
    #[error("Unknown event type code: {0}")]
    UnknownEventType(u8),

    /// The envelope carries no destination topic.
    #[error("Envelope {uuid} has no topic")]
    MissingTopic { uuid: String },
}

/// Errors raised while parsing version and schema identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The string is not of the form `<major>_<minor>`.
    #[error("Invalid version string: {0:?}")]
    InvalidVersion(String),

    /// The string is not of the form `<Base>_<major>_<minor>`.
    #[error("Invalid schema type name: {0:?}")]
    InvalidSchemaType(String),
}
