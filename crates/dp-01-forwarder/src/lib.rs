//! # Reliable Forwarder
//!
//! Moves envelopes from a durable list queue to a downstream `Publisher`
//! without losing them across crashes.
//!
//! ## Queue Layout
//!
//! | Key | Contents |
//! |-----|----------|
//! | `<queue>` | Main queue; producers push onto the head |
//! | `<queue>_in_progress` | Messages currently being forwarded |
//! | `<queue>__<uuid>` | Claim key, TTL = max processing time |
//! | `<queue>_in_progress__lock` | Sweep lock, TTL = in-progress length in seconds |
//! | `<queue>__dead` | Entries that can never be decoded or routed |
//!
//! ## Iteration
//!
//! ```text
//!   main ──BRPOPLPUSH──→ in_progress
//!                           │
//!                 decode + resolve topic ──fail──→ stays (sweep dead-letters it)
//!                           │
//!                   claim + publish
//!                    │            │
//!                   ok          error / timeout
//!                    │            │
//!       LREM in_progress      move_one(in_progress → head of main)
//! ```
//!
//! ## Failure Sweep
//!
//! Once per `failure_check_interval` (and on the first iteration) the
//! forwarder takes the sweep lock and moves every unclaimed in-progress
//! entry back to the main queue. A live claim means another worker owns
//! the message.
//!
//! ## Delivery
//!
//! At-least-once. Two forwarders racing on one queue, or a crash between
//! publish and removal, can deliver a message twice; nothing is ever
//! dropped while the store is healthy.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service.rs   - ReliableForwarder, ForwarderHandle              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  adapters/    - EnvelopeTopic, SchemaTopics                     │
//! │  ports/       - TopicResolver                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  domain/      - ForwarderConfig, QueueKeys, outcomes, errors    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{EnvelopeTopic, SchemaTopics};
pub use domain::*;
pub use ports::TopicResolver;
pub use service::{ForwarderHandle, ReliableForwarder};
