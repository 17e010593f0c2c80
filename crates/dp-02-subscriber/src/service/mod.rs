//! Subscriber services.

pub mod dispatcher;
pub mod pulling;

pub use dispatcher::Dispatcher;
pub use pulling::{PullingSubscriber, DEFAULT_PULL_WAIT};
