//! # Shared Types Crate
//!
//! This crate contains the `Envelope` wire record and the identifiers used to
//! route and version it: `EventType`, `PipelineVersion`, `SchemaType` and
//! `TopicNaming`.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: The envelope field set and the event-type
//!   codes (0=CREATED, 1=UPDATED, 2=DELETED) are defined here only.
//! - **Transport Agnostic**: The envelope has a binary form for binary-safe
//!   transports and a base64 text form for everything else.
//! - **Versioned Schemas**: Every payload type is named `<Base>_<major>_<minor>`
//!   and versions compare major first, then minor.

pub mod envelope;
pub mod errors;
pub mod topic;
pub mod version;

pub use envelope::{Envelope, EventType};
pub use errors::*;
pub use topic::{payload_class_and_version, TopicNaming};
pub use version::{PipelineVersion, SchemaType};
