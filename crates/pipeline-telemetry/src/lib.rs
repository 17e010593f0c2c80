//! # Pipeline Telemetry
//!
//! Structured logging and Prometheus metrics for every pipeline component.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pipeline_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::for_component("forwarder"))?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PIPELINE_SERVICE_NAME` | `data-pipeline` | Service name in startup logs |
//! | `PIPELINE_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `PIPELINE_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `PIPELINE_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod metrics;
mod tracing_setup;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle,
    EMITTER_MESSAGES_EMITTED, FORWARDER_CONSISTENCY_WARNINGS, FORWARDER_MESSAGES_DEAD_LETTERED,
    FORWARDER_MESSAGES_FORWARDED, FORWARDER_MESSAGES_RECLAIMED, FORWARDER_MESSAGES_REQUEUED,
    FORWARDER_PUBLISH_DURATION, REGISTRY, SUBSCRIBER_ENVELOPES,
};
pub use tracing_setup::{env_filter, init_tracing};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
///
/// # Example
///
/// ```rust,ignore
/// let config = TelemetryConfig::from_env();
/// let _guard = init_telemetry(config)?;
/// ```
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_tracing(&config)?;

    Ok(TelemetryGuard {
        config,
        metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    config: TelemetryConfig,
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// The configuration telemetry was started with.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Handle to the metrics registry.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.config.service_name, "Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
///
/// ```rust,ignore
/// metric_inc!(FORWARDER_MESSAGES_FORWARDED, &["pipeline"]);
/// ```
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
