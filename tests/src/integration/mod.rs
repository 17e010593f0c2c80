//! Cross-crate scenarios.

pub mod e2e_pipeline;
pub mod transports;
