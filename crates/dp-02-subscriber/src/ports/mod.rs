//! Ports layer for the subscriber.
//!
//! - Outbound (Driven) ports: payload handlers, record persistence and
//!   pull-style message sources

pub mod outbound;

pub use outbound::*;
