//! Durable-list publisher.
//!
//! Pushes envelope bytes onto a list in a `ListStore`, typically for a
//! forwarder to drain later.

use crate::list_store::ListStore;
use crate::publisher::{PublishError, Publisher};
use crate::DEFAULT_NAMESPACE;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Which list a published message lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRouting {
    /// Every topic shares one list (the forwarder re-derives the topic).
    Namespace(String),
    /// One list per topic, named after the topic.
    PerTopic,
}

impl Default for ListRouting {
    fn default() -> Self {
        Self::Namespace(DEFAULT_NAMESPACE.to_string())
    }
}

/// `Publisher` that pushes onto the head of a durable list.
pub struct ListPublisher<S: ListStore + ?Sized> {
    store: Arc<S>,
    routing: ListRouting,
}

impl<S: ListStore + ?Sized> ListPublisher<S> {
    /// Publish every topic onto the list `namespace`.
    pub fn namespaced(store: Arc<S>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            routing: ListRouting::Namespace(namespace.into()),
        }
    }

    /// Publish each topic onto its own list.
    pub fn per_topic(store: Arc<S>) -> Self {
        Self {
            store,
            routing: ListRouting::PerTopic,
        }
    }

    /// List key a message for `topic` is pushed onto.
    pub fn key_for<'a>(&'a self, topic: &'a str) -> &'a str {
        match &self.routing {
            ListRouting::Namespace(namespace) => namespace,
            ListRouting::PerTopic => topic,
        }
    }
}

#[async_trait]
impl<S: ListStore + ?Sized> Publisher for ListPublisher<S> {
    async fn publish(&self, topic: &str, data: &[u8]) -> Result<(), PublishError> {
        let started = Instant::now();
        let key = self.key_for(topic);
        let len = self.store.lpush(key, data).await?;
        debug!(
            topic,
            key,
            queue_len = len,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Published to durable list"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list_store::InMemoryListStore;

    #[tokio::test]
    async fn test_namespaced_publish() {
        let store = Arc::new(InMemoryListStore::new());
        let publisher = ListPublisher::namespaced(Arc::clone(&store), "my-app-pipeline");

        publisher.publish("orders", b"first").await.unwrap();
        publisher.publish("invoices", b"second").await.unwrap();

        assert_eq!(store.llen("my-app-pipeline").await.unwrap(), 2);
        // Oldest message sits at the tail, where consumers pop.
        assert_eq!(
            store.lrange("my-app-pipeline", -1, -1).await.unwrap(),
            vec![b"first".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_per_topic_publish() {
        let store = Arc::new(InMemoryListStore::new());
        let publisher = ListPublisher::per_topic(Arc::clone(&store));

        publisher.publish("orders", b"a").await.unwrap();
        publisher.publish("invoices", b"b").await.unwrap();

        assert_eq!(store.llen("orders").await.unwrap(), 1);
        assert_eq!(store.llen("invoices").await.unwrap(), 1);
    }

    #[test]
    fn test_default_routing() {
        assert_eq!(
            ListRouting::default(),
            ListRouting::Namespace("pipeline".to_string())
        );
    }
}
