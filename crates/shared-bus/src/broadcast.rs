//! # In-Process Pub/Sub Bus
//!
//! A broadcast transport for single-process deployments and tests.

use crate::publisher::{PublishError, Publisher};
use crate::subscriber::{Subscription, TopicFilter, TopicMessage};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// In-memory pub/sub transport.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// Messages published while nobody is subscribed are dropped, matching a
/// topic with no subscriptions on a hosted pub/sub service.
pub struct BroadcastBus {
    /// Broadcast sender for messages.
    sender: broadcast::Sender<TopicMessage>,

    /// Active subscription count by filter.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl BroadcastBus {
    /// Create a bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to messages matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: TopicFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        *self.subscriptions.write().entry(filter.key()).or_insert(0) += 1;

        debug!(topics = ?filter.topics, "New subscription created");

        Subscription::new(receiver, filter, Arc::clone(&self.subscriptions))
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the total number of messages published.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for BroadcastBus {
    async fn publish(&self, topic: &str, data: &[u8]) -> Result<(), PublishError> {
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let message = TopicMessage {
            topic: topic.to_string(),
            data: Arc::from(data),
        };

        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(topic, receivers, "Message published");
            }
            Err(e) => {
                warn!(topic, error = %e, "Message dropped (no subscribers)");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_no_subscribers() {
        let bus = BroadcastBus::new();
        assert!(bus.publish("orders", b"x").await.is_ok());
        assert_eq!(bus.messages_published(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_receives_matching_topic() {
        let bus = BroadcastBus::new();
        let mut sub = bus.subscribe(TopicFilter::topics(["orders"]));

        bus.publish("users", b"skip").await.unwrap();
        bus.publish("orders", b"keep").await.unwrap();

        let message = sub.recv().await.unwrap();
        assert_eq!(message.topic, "orders");
        assert_eq!(&*message.data, b"keep");
        assert_eq!(sub.try_recv().unwrap(), None);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = BroadcastBus::new();
        let _sub1 = bus.subscribe(TopicFilter::all());
        let _sub2 = bus.subscribe(TopicFilter::all());
        assert_eq!(bus.subscriber_count(), 2);
        assert_eq!(bus.subscriptions.read().get("*"), Some(&2));
    }

    #[tokio::test]
    async fn test_drop_untracks_subscription() {
        let bus = BroadcastBus::new();
        let sub = bus.subscribe(TopicFilter::topics(["orders"]));
        assert_eq!(bus.subscriptions.read().get("orders"), Some(&1));

        drop(sub);
        assert!(bus.subscriptions.read().get("orders").is_none());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_default_bus() {
        let bus = BroadcastBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
