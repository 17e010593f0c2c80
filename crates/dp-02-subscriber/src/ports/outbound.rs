//! Outbound (Driven) ports for the subscriber.

use crate::domain::{HandlerError, Payload, Record, Target};
use async_trait::async_trait;
use shared_bus::StoreError;
use shared_types::EventType;
use std::sync::Arc;
use std::time::Duration;

/// Extension point for applying a payload to an external system.
///
/// When a handler is registered for a payload type it takes precedence over
/// the target's own conversion methods.
#[async_trait]
pub trait PayloadHandler: Send + Sync {
    /// Apply `payload` for `target`.
    ///
    /// # Errors
    ///
    /// `HandlerError::NotFound` reaches the dispatcher's caller; other
    /// errors are logged by the dispatcher and the message is considered
    /// handled.
    async fn handle_payload(
        &self,
        payload: &Payload,
        target: &Target,
        event_type: EventType,
    ) -> Result<Option<Record>, HandlerError>;
}

#[async_trait]
impl<H: PayloadHandler + ?Sized> PayloadHandler for Arc<H> {
    async fn handle_payload(
        &self,
        payload: &Payload,
        target: &Target,
        event_type: EventType,
    ) -> Result<Option<Record>, HandlerError> {
        (**self).handle_payload(payload, target, event_type).await
    }
}

/// Persistence for records, addressed by table and id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The record with `id`, if any.
    async fn find(&self, table: &str, id: &str) -> Result<Option<Record>, HandlerError>;

    /// Store a new record.
    async fn insert(&self, table: &str, record: Record) -> Result<Record, HandlerError>;

    /// Replace the attributes of an existing record.
    async fn update(&self, table: &str, record: Record) -> Result<Record, HandlerError>;

    /// Remove the record with `id`, returning it.
    ///
    /// # Errors
    ///
    /// Returns `HandlerError::NotFound` if there is no such record.
    async fn delete(&self, table: &str, id: &str) -> Result<Record, HandlerError>;
}

/// One message taken from a [`MessageSource`], not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledMessage {
    /// Raw message bytes.
    pub body: Vec<u8>,
}

/// A queue consumers pull from and acknowledge explicitly.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Take the next message, waiting up to `wait`. `None` if the queue
    /// stayed empty.
    async fn pull(&self, wait: Duration) -> Result<Option<PulledMessage>, StoreError>;

    /// Delete an acknowledged message from the source.
    async fn ack(&self, message: &PulledMessage) -> Result<(), StoreError>;

    /// Make pulled messages whose reservation lapsed deliverable again.
    /// Returns how many were returned.
    async fn reclaim(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}
