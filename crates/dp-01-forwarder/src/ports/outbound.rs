//! Outbound (Driven) ports for the Reliable Forwarder.

use crate::domain::RouteError;
use shared_types::Envelope;

/// Computes the downstream topic for a decoded envelope.
pub trait TopicResolver: Send + Sync {
    /// Destination topic for `envelope`.
    ///
    /// # Errors
    ///
    /// Returns `RouteError` when the envelope metadata names no usable
    /// destination.
    fn resolve(&self, envelope: &Envelope) -> Result<String, RouteError>;
}

impl<R: TopicResolver + ?Sized> TopicResolver for std::sync::Arc<R> {
    fn resolve(&self, envelope: &Envelope) -> Result<String, RouteError> {
        (**self).resolve(envelope)
    }
}
