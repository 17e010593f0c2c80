//! Subscriber configuration.

use std::env;

/// Inbound processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// API keys an envelope may carry.
    pub api_keys: Vec<String>,
    /// When set, every envelope is skipped before verification.
    pub processing_disabled: bool,
}

impl SubscriberConfig {
    /// Read configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `PIPELINE_API_KEYS`: comma-separated accepted keys
    /// - `PIPELINE_DISABLED`, `PIPELINE_PROCESSING_DISABLED`: presence
    ///   disables processing, whatever the value
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_keys: lookup("PIPELINE_API_KEYS")
                .map(|keys| parse_api_keys(&keys))
                .unwrap_or_default(),
            processing_disabled: lookup("PIPELINE_DISABLED").is_some()
                || lookup("PIPELINE_PROCESSING_DISABLED").is_some(),
        }
    }

    /// Configuration accepting exactly `keys`.
    pub fn with_api_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            api_keys: keys.into_iter().map(Into::into).collect(),
            processing_disabled: false,
        }
    }

    /// Returns true if `key` is accepted.
    pub fn accepts(&self, key: &str) -> bool {
        self.api_keys.iter().any(|k| k == key)
    }
}

fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
