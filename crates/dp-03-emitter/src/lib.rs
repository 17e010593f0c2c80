//! # Emitter
//!
//! Producer side of the pipeline. A model that implements [`Emittable`]
//! publishes one encrypted envelope per pipeline version whenever it
//! changes:
//!
//! ```text
//!  model.pipeline_versions()      e.g. [1_1, 2_0]   (1_0 dropped once 1_x exists)
//!        │
//!        ├─ to_pipeline(1_1) ─→ encrypt ─→ publish("<prefix>-v1-<table>")
//!        └─ to_pipeline(2_0) ─→ encrypt ─→ publish("<prefix>-v2-<table>")
//! ```
//!
//! [`BasicEmitter::emit`] publishes a single hand-built message instead.
//!
//! ## Environment Variables
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `PIPELINE_DISABLED` | Disables emission (and processing) |
//! | `PIPELINE_EMISSION_DISABLED` | Disables emission |
//! | `PIPELINE_TOPIC_PREFIX` | Topic prefix (default `pipeline`) |

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::Emittable;
pub use service::BasicEmitter;
