//! # Domain Layer - Emitter
//!
//! - `config`: `EmitterConfig` (emission switch, topic naming)
//! - `message`: `MessageParams`, `Change`
//! - `errors`: `EmitError`

pub mod config;
pub mod errors;
pub mod message;

pub use config::*;
pub use errors::*;
pub use message::*;
