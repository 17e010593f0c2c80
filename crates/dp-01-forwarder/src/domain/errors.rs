//! Forwarder error types.

use shared_bus::StoreError;
use thiserror::Error;

/// Failures that abort one forwarder operation.
///
/// Per-message problems (bad bytes, publish failures) are not errors; they
/// are reported through [`super::IterationOutcome`].
#[derive(Debug, Error)]
pub enum ForwarderError {
    /// The durable-list store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A configuration variable could not be parsed.
    #[error("Invalid value {value:?} for {var}")]
    InvalidConfig { var: String, value: String },
}

/// Why a decoded envelope has no destination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The envelope carries an empty topic.
    #[error("Envelope {uuid} has no topic")]
    MissingTopic { uuid: String },

    /// The type info has no version suffix.
    #[error("Type info {0:?} has no version")]
    MissingVersion(String),

    /// No table is known for the payload class.
    #[error("No topic table registered for {0:?}")]
    UnknownClass(String),
}
