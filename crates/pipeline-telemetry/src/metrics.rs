//! Prometheus metrics for pipeline components.
//!
//! All metrics follow the naming convention: `pipeline_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // FORWARDER METRICS
    // =========================================================================

    /// Messages re-published and removed from the in-progress queue
    pub static ref FORWARDER_MESSAGES_FORWARDED: IntCounterVec = IntCounterVec::new(
        Opts::new("pipeline_forwarder_messages_forwarded_total", "Messages forwarded downstream"),
        &["queue"]
    ).expect("metric creation failed");

    /// Messages put back onto the main queue after a failed publish
    pub static ref FORWARDER_MESSAGES_REQUEUED: IntCounterVec = IntCounterVec::new(
        Opts::new("pipeline_forwarder_messages_requeued_total", "Messages put back after publish failure"),
        &["queue"]
    ).expect("metric creation failed");

    /// Abandoned messages moved back by the failure sweep
    pub static ref FORWARDER_MESSAGES_RECLAIMED: IntCounterVec = IntCounterVec::new(
        Opts::new("pipeline_forwarder_messages_reclaimed_total", "Abandoned in-progress messages reclaimed"),
        &["queue"]
    ).expect("metric creation failed");

    /// Undecodable messages moved to the dead-letter list
    pub static ref FORWARDER_MESSAGES_DEAD_LETTERED: IntCounterVec = IntCounterVec::new(
        Opts::new("pipeline_forwarder_messages_dead_lettered_total", "Undecodable messages dead-lettered"),
        &["queue"]
    ).expect("metric creation failed");

    /// In-progress removals that did not remove exactly one message
    pub static ref FORWARDER_CONSISTENCY_WARNINGS: IntCounterVec = IntCounterVec::new(
        Opts::new("pipeline_forwarder_consistency_warnings_total", "Unexpected in-progress removal counts"),
        &["queue"]
    ).expect("metric creation failed");

    /// Downstream publish latency
    pub static ref FORWARDER_PUBLISH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pipeline_forwarder_publish_duration_seconds",
            "Time spent publishing one message downstream"
        ).buckets(exponential_buckets(0.001, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // SUBSCRIBER METRICS
    // =========================================================================

    /// Envelopes seen by dispatchers, by outcome
    pub static ref SUBSCRIBER_ENVELOPES: IntCounterVec = IntCounterVec::new(
        Opts::new("pipeline_subscriber_envelopes_total", "Envelopes dispatched by outcome"),
        &["outcome"]  // handled, dropped, skipped, rejected
    ).expect("metric creation failed");

    // =========================================================================
    // EMITTER METRICS
    // =========================================================================

    /// Envelopes published by emitters
    pub static ref EMITTER_MESSAGES_EMITTED: IntCounterVec = IntCounterVec::new(
        Opts::new("pipeline_emitter_messages_emitted_total", "Envelopes emitted by event type"),
        &["event_type"]
    ).expect("metric creation failed");
}

/// Handle to the registry the metrics were registered with
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// The registry holding pipeline metrics.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; already registered collectors are skipped.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Forwarder
        Box::new(FORWARDER_MESSAGES_FORWARDED.clone()),
        Box::new(FORWARDER_MESSAGES_REQUEUED.clone()),
        Box::new(FORWARDER_MESSAGES_RECLAIMED.clone()),
        Box::new(FORWARDER_MESSAGES_DEAD_LETTERED.clone()),
        Box::new(FORWARDER_CONSISTENCY_WARNINGS.clone()),
        Box::new(FORWARDER_PUBLISH_DURATION.clone()),
        // Subscriber
        Box::new(SUBSCRIBER_ENVELOPES.clone()),
        // Emitter
        Box::new(EMITTER_MESSAGES_EMITTED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::HistogramTimer::new(&$histogram)
    };
}
