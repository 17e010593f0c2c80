//! Emitter configuration.

use shared_types::TopicNaming;
use std::env;

/// Outbound settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitterConfig {
    /// When set, `emit` publishes nothing.
    pub emission_disabled: bool,
    /// How model topics are named.
    pub naming: TopicNaming,
}

impl EmitterConfig {
    /// Read configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `PIPELINE_DISABLED`, `PIPELINE_EMISSION_DISABLED`: presence
    ///   disables emission
    /// - `PIPELINE_TOPIC_PREFIX`: topic prefix (default: pipeline)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            emission_disabled: lookup("PIPELINE_DISABLED").is_some()
                || lookup("PIPELINE_EMISSION_DISABLED").is_some(),
            naming: lookup("PIPELINE_TOPIC_PREFIX")
                .filter(|prefix| !prefix.trim().is_empty())
                .map(TopicNaming::new)
                .unwrap_or_default(),
        }
    }
}
