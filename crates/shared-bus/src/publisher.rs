//! # Publisher
//!
//! Defines the publishing side shared by every transport.

use crate::list_store::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from publish operations.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The transport failed to accept the message.
    #[error("Transport error publishing to {topic}: {reason}")]
    Transport { topic: String, reason: String },

    /// The transport answered with a non-success status.
    #[error("Transport rejected message for {topic} with status {status}")]
    Rejected { topic: String, status: u16 },

    /// The publish call did not complete in time.
    #[error("Publishing to {topic} timed out after {after:?}")]
    Timeout { topic: String, after: Duration },

    /// The durable-list store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Trait for publishing envelope bytes to a topic.
///
/// Implementations must tolerate being called repeatedly with the same bytes
/// and must never mutate `data`.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `data` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` on transport failure.
    async fn publish(&self, topic: &str, data: &[u8]) -> Result<(), PublishError>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    async fn publish(&self, topic: &str, data: &[u8]) -> Result<(), PublishError> {
        (**self).publish(topic, data).await
    }
}

/// In-process publisher that records every message it is given.
///
/// Used for local runs and as the sink in tests.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryPublisher {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all `(topic, data)` pairs in publish order.
    #[must_use]
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().clone()
    }

    /// Number of messages published so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.published.lock().len()
    }

    /// Returns true if nothing was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.published.lock().is_empty()
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, topic: &str, data: &[u8]) -> Result<(), PublishError> {
        self.published.lock().push((topic.to_string(), data.to_vec()));
        debug!(topic, bytes = data.len(), "Recorded message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_publisher_records() {
        let publisher = MemoryPublisher::new();
        assert!(publisher.is_empty());

        publisher.publish("orders", b"one").await.unwrap();
        publisher.publish("orders", b"one").await.unwrap();

        assert_eq!(publisher.len(), 2);
        assert_eq!(
            publisher.published()[0],
            ("orders".to_string(), b"one".to_vec())
        );
    }

    #[tokio::test]
    async fn test_publish_through_arc() {
        let publisher: Arc<dyn Publisher> = Arc::new(MemoryPublisher::new());
        assert!(publisher.publish("t", b"x").await.is_ok());
    }
}
