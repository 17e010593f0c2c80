//! # Shared Bus - Publisher Capability and Transports
//!
//! Every transport that carries pipeline envelopes implements one contract:
//!
//! ```text
//! publish(topic, bytes) -> Result<(), PublishError>
//! ```
//!
//! ## Transports
//!
//! ```text
//! ┌──────────────┐  publish()   ┌──────────────────┐
//! │   Emitter    │ ───────────→ │  ListPublisher   │──→ durable list (ListStore)
//! │  Forwarder   │              │  BroadcastBus    │──→ in-process pub/sub
//! │              │              │  HttpPushPublisher│──→ HTTP push queue
//! └──────────────┘              └──────────────────┘
//! ```
//!
//! ## Delivery Model
//!
//! - **At-least-once**: publishing the same bytes twice is allowed; consumers
//!   tolerate duplicates.
//! - **Opaque bytes**: no transport inspects or mutates `data`.
//! - **Atomic list primitives**: `ListStore` exposes only operations the
//!   backing store performs atomically, including the conditional
//!   `move_one` used for put-back and reclaim.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod broadcast;
pub mod list_publisher;
pub mod list_store;
pub mod publisher;
pub mod push_queue;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod subscriber;

// Re-export main types
pub use broadcast::BroadcastBus;
pub use list_publisher::{ListPublisher, ListRouting};
pub use list_store::{InMemoryListStore, ListStore, StoreError};
pub use publisher::{MemoryPublisher, PublishError, Publisher};
pub use push_queue::{decode_push_body, HttpPushPublisher, PushBodyError};
#[cfg(feature = "redis")]
pub use redis_store::RedisListStore;
pub use subscriber::{Subscription, SubscriptionError, TopicFilter, TopicMessage};

/// Maximum messages to buffer per broadcast subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Default durable-list key producers push onto.
pub const DEFAULT_NAMESPACE: &str = "pipeline";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }

    #[test]
    fn test_default_namespace() {
        assert_eq!(DEFAULT_NAMESPACE, "pipeline");
    }
}
