//! # Pipeline Runtime
//!
//! Startup wiring shared by the pipeline binaries.
//!
//! ## Forwarder Startup Sequence
//!
//! 1. Initialize telemetry (`PIPELINE_LOG_LEVEL`, `PIPELINE_JSON_LOGS`)
//! 2. Load `ForwarderConfig` from the environment; the first CLI argument
//!    overrides the queue key
//! 3. Connect the Redis list store (`PIPELINE_REDIS_URL`)
//! 4. Pick the downstream publisher: push queue if `PIPELINE_PUSH_URL` is
//!    set, otherwise one durable list per topic
//! 5. Run until SIGINT or SIGTERM, then finish the current iteration

use std::env;
use thiserror::Error;

/// Default Redis address.
pub const DEFAULT_REDIS_URL: &str = "localhost:6379";

/// Runtime configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeConfigError {
    #[error("PIPELINE_PUSH_URL is set but PIPELINE_PUSH_TOKEN is missing")]
    MissingPushToken,
}

/// Where forwarded messages go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Downstream {
    /// HTTP push queue.
    PushQueue { base_url: String, token: String },
    /// One durable list per destination topic, in the same store.
    TopicLists,
}

/// Process-level settings not owned by any component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Durable-list store address.
    pub redis_url: String,
    /// Forwarding destination.
    pub downstream: Downstream,
}

impl RuntimeConfig {
    /// Read configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `PIPELINE_REDIS_URL`: store address (default: localhost:6379)
    /// - `PIPELINE_PUSH_URL`, `PIPELINE_PUSH_TOKEN`: push-queue endpoint
    pub fn from_env() -> Result<Self, RuntimeConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration from an arbitrary variable lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RuntimeConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let downstream = match non_empty("PIPELINE_PUSH_URL") {
            Some(base_url) => Downstream::PushQueue {
                base_url,
                token: non_empty("PIPELINE_PUSH_TOKEN")
                    .ok_or(RuntimeConfigError::MissingPushToken)?,
            },
            None => Downstream::TopicLists,
        };

        Ok(Self {
            redis_url: non_empty("PIPELINE_REDIS_URL")
                .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            downstream,
        })
    }
}

/// Queue key given as the first positional argument, if any.
pub fn queue_from_args(mut args: impl Iterator<Item = String>) -> Option<String> {
    args.nth(1).filter(|queue| !queue.trim().is_empty())
}
