//! Ports layer for the Reliable Forwarder.
//!
//! - Outbound (Driven) ports: destination topic resolution
//!
//! The store and publisher ports live in `shared-bus` (`ListStore`,
//! `Publisher`) because producers and subscribers use them too.

pub mod outbound;

pub use outbound::*;
