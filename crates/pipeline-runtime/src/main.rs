//! # Forwarder
//!
//! Drains a Redis list queue into the push queue or per-topic lists.
//!
//! ```text
//! forwarder [QUEUE]
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use dp_01_forwarder::{ForwarderConfig, ForwarderHandle, ReliableForwarder};
use pipeline_runtime::{queue_from_args, Downstream, RuntimeConfig};
use pipeline_telemetry::{init_telemetry, TelemetryConfig};
use shared_bus::{HttpPushPublisher, ListPublisher, Publisher, RedisListStore};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_component("forwarder"))
        .context("Failed to initialize telemetry")?;

    let mut config = ForwarderConfig::from_env().context("Invalid forwarder configuration")?;
    if let Some(queue) = queue_from_args(std::env::args()) {
        config = config.with_queue(queue);
    }
    let runtime = RuntimeConfig::from_env().context("Invalid runtime configuration")?;

    let store = Arc::new(
        RedisListStore::connect(&runtime.redis_url)
            .await
            .context("Failed to connect to the list store")?,
    );

    let publisher: Arc<dyn Publisher> = match &runtime.downstream {
        Downstream::PushQueue { base_url, token } => {
            info!(url = %base_url, "Forwarding to push queue");
            Arc::new(
                HttpPushPublisher::new(base_url.clone(), token.clone())
                    .context("Failed to build push-queue client")?,
            )
        }
        Downstream::TopicLists => {
            info!("Forwarding to per-topic lists");
            Arc::new(ListPublisher::per_topic(store.clone()))
        }
    };

    info!(
        queue = %config.queue,
        blocking_timeout = ?config.blocking_timeout,
        failure_check_interval = ?config.failure_check_interval,
        max_processing_time = ?config.max_processing_time,
        "Starting reliable forwarder"
    );

    let mut forwarder = ReliableForwarder::new(store, publisher, config);
    tokio::spawn(stop_on_signal(forwarder.handle()));

    let processed = forwarder.start().await;
    info!(processed, "Forwarder stopped");
    Ok(())
}

/// Request a graceful stop on SIGINT or SIGTERM.
async fn stop_on_signal(handle: ForwarderHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
    handle.stop();
}
