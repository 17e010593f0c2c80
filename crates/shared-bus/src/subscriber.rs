//! # Broadcast Subscriber
//!
//! Defines the subscription side of the in-process pub/sub bus.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was closed.
    #[error("Pub/sub bus closed")]
    Closed,
}

/// A message delivered on the pub/sub bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Opaque envelope bytes.
    pub data: Arc<[u8]>,
}

/// Which topics a subscription receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicFilter {
    /// Topics to receive; empty means all.
    pub topics: Vec<String>,
}

impl TopicFilter {
    /// Receive every topic.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Receive only the listed topics.
    pub fn topics<I, T>(topics: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `message` passes the filter.
    #[must_use]
    pub fn matches(&self, message: &TopicMessage) -> bool {
        self.topics.is_empty() || self.topics.iter().any(|t| *t == message.topic)
    }

    pub(crate) fn key(&self) -> String {
        if self.topics.is_empty() {
            "*".to_string()
        } else {
            self.topics.join(",")
        }
    }
}

/// A subscription handle for receiving messages.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<TopicMessage>,

    /// Filter for this subscription.
    filter: TopicFilter,

    /// Reference to subscription tracking (for cleanup).
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Filter key for this subscription.
    filter_key: String,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<TopicMessage>,
        filter: TopicFilter,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
    ) -> Self {
        let filter_key = filter.key();
        Self {
            receiver,
            filter,
            subscriptions,
            filter_key,
        }
    }

    /// Receive the next message that matches the filter.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<TopicMessage> {
        loop {
            let message = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some messages dropped");
                    continue;
                }
            };

            if self.filter.matches(&message) {
                return Some(message);
            }
        }
    }

    /// Try to receive the next matching message without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was available and matched
    /// - `Ok(None)` - No message available (would block)
    /// - `Err(SubscriptionError::Closed)` - The bus was closed
    pub fn try_recv(&mut self) -> Result<Option<TopicMessage>, SubscriptionError> {
        loop {
            let message = match self.receiver.try_recv() {
                Ok(m) => m,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches(&message) {
                return Ok(Some(message));
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &TopicFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subs = self.subscriptions.write();
        let Some(count) = subs.get_mut(&self.filter_key) else {
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.filter_key);
        }
        debug!(filter = %self.filter_key, "Subscription dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(topic: &str) -> TopicMessage {
        TopicMessage {
            topic: topic.to_string(),
            data: Arc::from(&b"x"[..]),
        }
    }

    #[test]
    fn test_filter_all() {
        assert!(TopicFilter::all().matches(&message("anything")));
    }

    #[test]
    fn test_filter_topics() {
        let filter = TopicFilter::topics(["orders", "invoices"]);
        assert!(filter.matches(&message("orders")));
        assert!(!filter.matches(&message("users")));
        assert_eq!(filter.key(), "orders,invoices");
    }
}
