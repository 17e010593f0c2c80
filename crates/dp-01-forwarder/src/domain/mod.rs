//! # Domain Layer - Reliable Forwarder
//!
//! - `config`: `ForwarderConfig` and its environment surface
//! - `keys`: main, in-progress, lock, dead-letter and claim key names
//! - `outcome`: `IterationOutcome`, `SweepReport`
//! - `errors`: `ForwarderError`, `RouteError`

pub mod config;
pub mod errors;
pub mod keys;
pub mod outcome;

pub use config::*;
pub use errors::*;
pub use keys::*;
pub use outcome::*;
