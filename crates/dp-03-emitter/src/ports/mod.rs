//! Ports layer for the emitter.
//!
//! - Driving port: `Emittable`, implemented by application models that
//!   publish their changes

pub mod emittable;

pub use emittable::*;
