//! Forwarder configuration.

use super::errors::ForwarderError;
use shared_bus::DEFAULT_NAMESPACE;
use std::env;
use std::time::Duration;

/// Tunables for one forwarder instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Main queue key.
    pub queue: String,
    /// How long one blocking pop waits on an empty queue.
    pub blocking_timeout: Duration,
    /// Minimum time between failure sweeps.
    pub failure_check_interval: Duration,
    /// Claim TTL; a message unclaimed for this long is presumed abandoned.
    pub max_processing_time: Duration,
    /// Upper bound on one publish call (`None` = wait forever).
    pub publish_timeout: Option<Duration>,
    /// Value stored in claim and lock keys to identify this worker.
    pub client_id: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            queue: DEFAULT_NAMESPACE.to_string(),
            blocking_timeout: Duration::from_secs(1),
            failure_check_interval: Duration::from_secs(30),
            max_processing_time: Duration::from_secs(10),
            publish_timeout: Some(Duration::from_secs(30)),
            client_id: format!("reliable-forwarder-{}", std::process::id()),
        }
    }
}

impl ForwarderConfig {
    /// Read configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `PIPELINE_FORWARDER_KEY`: main queue key (default: pipeline)
    /// - `PIPELINE_BLOCKING_TIMEOUT_SECS`: blocking pop timeout (default: 1)
    /// - `PIPELINE_FAILURE_CHECK_INTERVAL_SECS`: sweep interval (default: 30)
    /// - `PIPELINE_MAX_PROCESSING_SECS`: claim TTL (default: 10)
    /// - `PIPELINE_PUBLISH_TIMEOUT_SECS`: publish bound, 0 disables (default: 30)
    pub fn from_env() -> Result<Self, ForwarderError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ForwarderError> {
        let defaults = Self::default();
        let secs = |var: &str, default: Duration| -> Result<Duration, ForwarderError> {
            match lookup(var) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ForwarderError::InvalidConfig {
                        var: var.to_string(),
                        value: raw,
                    }),
            }
        };

        let publish_timeout = secs(
            "PIPELINE_PUBLISH_TIMEOUT_SECS",
            defaults.publish_timeout.unwrap_or_default(),
        )?;

        Ok(Self {
            queue: lookup("PIPELINE_FORWARDER_KEY").unwrap_or(defaults.queue),
            blocking_timeout: secs("PIPELINE_BLOCKING_TIMEOUT_SECS", defaults.blocking_timeout)?,
            failure_check_interval: secs(
                "PIPELINE_FAILURE_CHECK_INTERVAL_SECS",
                defaults.failure_check_interval,
            )?,
            max_processing_time: secs(
                "PIPELINE_MAX_PROCESSING_SECS",
                defaults.max_processing_time,
            )?,
            publish_timeout: (!publish_timeout.is_zero()).then_some(publish_timeout),
            client_id: defaults.client_id,
        })
    }

    /// Same configuration for a different main queue.
    #[must_use]
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Creates a fast-cycling config for testing.
    pub fn for_testing(queue: &str) -> Self {
        Self {
            queue: queue.to_string(),
            blocking_timeout: Duration::from_millis(50),
            failure_check_interval: Duration::from_secs(5),
            max_processing_time: Duration::from_secs(2),
            publish_timeout: Some(Duration::from_secs(1)),
            client_id: "test-forwarder".to_string(),
        }
    }
}
