//! Adapters for the forwarder's outbound ports.

pub mod topic_resolvers;

pub use topic_resolvers::*;
