//! # Reliable Forwarder Service
//!
//! Drains a durable main queue into a `Publisher` using the reliable-queue
//! pattern: every message is atomically moved onto an in-progress list
//! before it is touched, and only leaves that list once it has been
//! published or put back.

use crate::adapters::EnvelopeTopic;
use crate::domain::{ForwarderConfig, ForwarderError, IterationOutcome, QueueKeys, SweepReport};
use crate::ports::TopicResolver;
use pipeline_telemetry::{
    metric_inc, HistogramTimer, FORWARDER_CONSISTENCY_WARNINGS, FORWARDER_MESSAGES_DEAD_LETTERED,
    FORWARDER_MESSAGES_FORWARDED, FORWARDER_MESSAGES_RECLAIMED, FORWARDER_MESSAGES_REQUEUED,
    FORWARDER_PUBLISH_DURATION,
};
use shared_bus::{ListStore, PublishError, Publisher, StoreError};
use shared_types::Envelope;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Why a decoded message could not be forwarded.
#[derive(Debug, Error)]
enum ForwardFailure {
    #[error("claim failed: {0}")]
    Claim(StoreError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("in-progress removal failed: {0}")]
    Remove(StoreError),
}

/// Stops a running forwarder from another task.
///
/// The loop notices the request at the top of its next iteration; an
/// in-flight publish is never interrupted.
#[derive(Debug, Clone)]
pub struct ForwarderHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl ForwarderHandle {
    /// Ask the forwarder to finish its current iteration and exit.
    pub fn stop(&self) {
        info!("Stopping forwarder...");
        self.stop.send_replace(true);
    }

    /// Returns true once a stop was requested.
    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }
}

/// Forwards messages from a durable list queue to a publisher with
/// at-least-once delivery.
pub struct ReliableForwarder<S, P, R = EnvelopeTopic>
where
    S: ListStore + ?Sized,
    P: Publisher + ?Sized,
    R: TopicResolver,
{
    store: Arc<S>,
    publisher: Arc<P>,
    resolver: R,
    config: ForwarderConfig,
    keys: QueueKeys,
    processed: AtomicU64,
    last_sweep: Option<Instant>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl<S, P> ReliableForwarder<S, P, EnvelopeTopic>
where
    S: ListStore + ?Sized,
    P: Publisher + ?Sized,
{
    /// Forwarder that publishes to the topic stamped on each envelope.
    pub fn new(store: Arc<S>, publisher: Arc<P>, config: ForwarderConfig) -> Self {
        Self::with_resolver(store, publisher, EnvelopeTopic, config)
    }
}

impl<S, P, R> ReliableForwarder<S, P, R>
where
    S: ListStore + ?Sized,
    P: Publisher + ?Sized,
    R: TopicResolver,
{
    /// Forwarder with a custom destination resolver.
    pub fn with_resolver(store: Arc<S>, publisher: Arc<P>, resolver: R, config: ForwarderConfig) -> Self {
        let keys = QueueKeys::new(&config.queue);
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            store,
            publisher,
            resolver,
            config,
            keys,
            processed: AtomicU64::new(0),
            last_sweep: None,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    /// Main queue key.
    pub fn queue(&self) -> &str {
        self.keys.main()
    }

    /// In-progress queue key.
    pub fn in_progress_queue(&self) -> &str {
        self.keys.in_progress()
    }

    /// All keys this forwarder uses.
    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    /// Messages successfully published since construction.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Handle that can stop `start` from another task.
    pub fn handle(&self) -> ForwarderHandle {
        ForwarderHandle {
            stop: Arc::clone(&self.stop_tx),
        }
    }

    /// Request a graceful stop.
    pub fn stop(&self) {
        self.handle().stop();
    }

    /// Move one message to the in-progress queue and forward it.
    ///
    /// Blocks up to `blocking_timeout` on an empty queue. Messages that
    /// cannot be decoded or routed stay on the in-progress queue for the
    /// failure sweep. A failed publish puts the message back on the head of
    /// the main queue.
    ///
    /// # Errors
    ///
    /// Returns `ForwarderError::Store` only when the store itself fails.
    pub async fn process_queue(&self) -> Result<IterationOutcome, ForwarderError> {
        let Some(data) = self
            .store
            .brpoplpush(
                self.keys.main(),
                self.keys.in_progress(),
                self.config.blocking_timeout,
            )
            .await?
        else {
            return Ok(IterationOutcome::Idle);
        };

        let envelope = match Envelope::decode(&data) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    queue = self.keys.main(),
                    bytes = data.len(),
                    error = %e,
                    "Undecodable message left on in-progress queue"
                );
                return Ok(IterationOutcome::Undecodable);
            }
        };

        let topic = match self.resolver.resolve(&envelope) {
            Ok(topic) => topic,
            Err(e) => {
                warn!(
                    queue = self.keys.main(),
                    uuid = %envelope.uuid,
                    type_info = %envelope.type_info,
                    error = %e,
                    "Unroutable message left on in-progress queue"
                );
                return Ok(IterationOutcome::Unroutable {
                    uuid: envelope.uuid,
                });
            }
        };

        debug!(uuid = %envelope.uuid, topic = %topic, "Processing message");

        match self.forward(&envelope.uuid, &topic, &data).await {
            Ok(()) => Ok(IterationOutcome::Forwarded {
                uuid: envelope.uuid,
                topic,
            }),
            Err(failure) => {
                warn!(
                    queue = self.keys.main(),
                    uuid = %envelope.uuid,
                    topic = %topic,
                    error = %failure,
                    "Putting message back on main queue"
                );
                self.put_back(&data).await?;
                self.release_claim(&envelope.uuid).await;
                metric_inc!(FORWARDER_MESSAGES_REQUEUED, &[self.keys.main()]);
                Ok(IterationOutcome::Requeued {
                    uuid: envelope.uuid,
                    reason: failure.to_string(),
                })
            }
        }
    }

    /// Record in the store that this worker owns message `uuid`.
    ///
    /// The claim expires after `max_processing_time`; the failure sweep
    /// leaves claimed messages alone until then.
    pub async fn report(&self, uuid: &str) -> Result<(), ForwarderError> {
        self.claim(uuid).await?;
        Ok(())
    }

    /// Reclaim abandoned messages from the in-progress queue.
    ///
    /// Takes the sweep lock (TTL of one second per in-progress entry) and
    /// moves every unclaimed entry back onto the main queue. Entries that can
    /// never be forwarded go to the dead-letter list instead. The lock is
    /// released when the sweep finishes; the TTL only bounds a crashed sweep.
    pub async fn check_for_failures(&self) -> Result<SweepReport, ForwarderError> {
        let in_progress = self.store.llen(self.keys.in_progress()).await?;
        let lock_ttl = Duration::from_secs(in_progress.max(1) as u64);

        let locked = self
            .store
            .set_nx_ex(
                self.keys.lock(),
                self.config.client_id.as_bytes(),
                lock_ttl,
            )
            .await?;
        if !locked {
            debug!(queue = self.keys.in_progress(), "In-progress queue is locked");
            return Ok(SweepReport {
                locked_out: true,
                ..SweepReport::default()
            });
        }

        let mut report = SweepReport::default();
        for message in self.store.lrange(self.keys.in_progress(), 0, -1).await? {
            report.scanned += 1;

            let envelope = match self.forwardable(&message) {
                Ok(envelope) => envelope,
                Err(reason) => {
                    if self
                        .store
                        .move_one(self.keys.in_progress(), self.keys.dead_letter(), &message)
                        .await?
                    {
                        report.dead_lettered += 1;
                        metric_inc!(FORWARDER_MESSAGES_DEAD_LETTERED, &[self.keys.main()]);
                        warn!(
                            dead_letter = self.keys.dead_letter(),
                            reason = %reason,
                            "Moved unforwardable message to dead-letter list"
                        );
                    }
                    continue;
                }
            };

            match self.store.get(&self.keys.claim(&envelope.uuid)).await? {
                Some(owner) => {
                    report.owned += 1;
                    debug!(
                        uuid = %envelope.uuid,
                        owner = %String::from_utf8_lossy(&owner),
                        "Message is owned"
                    );
                }
                None => {
                    if self
                        .store
                        .move_one(self.keys.in_progress(), self.keys.main(), &message)
                        .await?
                    {
                        report.reclaimed += 1;
                        metric_inc!(FORWARDER_MESSAGES_RECLAIMED, &[self.keys.main()]);
                        info!(
                            uuid = %envelope.uuid,
                            "Putting timed-out message back on main queue"
                        );
                    }
                }
            }
        }

        self.release_sweep_lock().await;
        Ok(report)
    }

    /// One loop iteration: process the queue, then sweep if one is due.
    ///
    /// The first call always sweeps.
    pub async fn run(&mut self) -> Result<IterationOutcome, ForwarderError> {
        let outcome = self.process_queue().await?;
        debug!(
            queue = self.keys.main(),
            outcome = outcome.label(),
            processed = self.processed(),
            "Iteration complete"
        );

        if self.sweep_due() {
            self.last_sweep = Some(Instant::now());
            let report = self.check_for_failures().await?;
            if report.reclaimed > 0 || report.dead_lettered > 0 {
                info!(
                    queue = self.keys.main(),
                    scanned = report.scanned,
                    reclaimed = report.reclaimed,
                    dead_lettered = report.dead_lettered,
                    "Failure sweep finished"
                );
            }
        }

        Ok(outcome)
    }

    /// Run until stopped. Returns the processed count.
    ///
    /// Iteration errors are logged and never end the loop; after one the
    /// loop pauses for `blocking_timeout` before retrying.
    pub async fn start(&mut self) -> u64 {
        info!(
            queue = self.keys.main(),
            in_progress = self.keys.in_progress(),
            client_id = %self.config.client_id,
            "Forwarder started"
        );

        loop {
            let stopped = *self.stop_rx.borrow();
            if stopped {
                info!(processed = self.processed(), "Finished");
                break;
            }

            if let Err(e) = self.run().await {
                error!(queue = self.keys.main(), error = %e, "Forwarder iteration failed");
                tokio::time::sleep(self.config.blocking_timeout).await;
            }
        }

        self.processed()
    }

    fn sweep_due(&self) -> bool {
        self.last_sweep
            .map_or(true, |at| at.elapsed() >= self.config.failure_check_interval)
    }

    fn forwardable(&self, message: &[u8]) -> Result<Envelope, String> {
        let envelope = Envelope::decode(message).map_err(|e| e.to_string())?;
        self.resolver.resolve(&envelope).map_err(|e| e.to_string())?;
        Ok(envelope)
    }

    async fn forward(&self, uuid: &str, topic: &str, data: &[u8]) -> Result<(), ForwardFailure> {
        self.claim(uuid).await.map_err(ForwardFailure::Claim)?;

        {
            let _timer = HistogramTimer::new(&FORWARDER_PUBLISH_DURATION);
            self.publish_claimed(uuid, topic, data).await?;
        }
        self.processed.fetch_add(1, Ordering::Relaxed);
        metric_inc!(FORWARDER_MESSAGES_FORWARDED, &[self.keys.main()]);

        let removed = self
            .store
            .lrem(self.keys.in_progress(), 1, data)
            .await
            .map_err(ForwardFailure::Remove)?;
        if removed != 1 {
            warn!(
                queue = self.keys.in_progress(),
                uuid,
                removed,
                "Did not remove the expected message from the in-progress queue"
            );
            metric_inc!(FORWARDER_CONSISTENCY_WARNINGS, &[self.keys.main()]);
        }

        self.release_claim(uuid).await;
        Ok(())
    }

    /// Publish while renewing the claim every half `max_processing_time`,
    /// so a slow publish is never mistaken for an abandoned message.
    async fn publish_claimed(
        &self,
        uuid: &str,
        topic: &str,
        data: &[u8],
    ) -> Result<(), PublishError> {
        let period = (self.config.max_processing_time / 2).max(Duration::from_millis(1));
        let mut renew = tokio::time::interval_at(Instant::now() + period, period);
        let publish = self.publish_bounded(topic, data);
        tokio::pin!(publish);

        loop {
            tokio::select! {
                result = &mut publish => return result,
                _ = renew.tick() => {
                    if let Err(e) = self.claim(uuid).await {
                        warn!(uuid, error = %e, "Failed to renew claim");
                    }
                }
            }
        }
    }

    async fn publish_bounded(&self, topic: &str, data: &[u8]) -> Result<(), PublishError> {
        match self.config.publish_timeout {
            None => self.publisher.publish(topic, data).await,
            Some(after) => tokio::time::timeout(after, self.publisher.publish(topic, data))
                .await
                .unwrap_or_else(|_| {
                    Err(PublishError::Timeout {
                        topic: topic.to_string(),
                        after,
                    })
                }),
        }
    }

    async fn claim(&self, uuid: &str) -> Result<(), StoreError> {
        self.store
            .set_ex(
                &self.keys.claim(uuid),
                self.config.client_id.as_bytes(),
                self.config.max_processing_time,
            )
            .await
    }

    /// Drop the sweep lock if this worker still holds it.
    async fn release_sweep_lock(&self) {
        let held = match self.store.get(self.keys.lock()).await {
            Ok(owner) => owner.as_deref() == Some(self.config.client_id.as_bytes()),
            Err(e) => {
                warn!(lock = self.keys.lock(), error = %e, "Failed to read sweep lock");
                return;
            }
        };
        if held {
            if let Err(e) = self.store.del(self.keys.lock()).await {
                warn!(lock = self.keys.lock(), error = %e, "Failed to release sweep lock");
            }
        }
    }

    async fn release_claim(&self, uuid: &str) {
        if let Err(e) = self.store.del(&self.keys.claim(uuid)).await {
            warn!(uuid, error = %e, "Failed to release claim");
        }
    }

    /// Atomically move `data` from the in-progress queue back to the head of
    /// the main queue.
    async fn put_back(&self, data: &[u8]) -> Result<bool, ForwarderError> {
        let moved = self
            .store
            .move_one(self.keys.in_progress(), self.keys.main(), data)
            .await?;
        if !moved {
            error!(
                queue = self.keys.in_progress(),
                "Message was not on the in-progress queue; nothing put back"
            );
            metric_inc!(FORWARDER_CONSISTENCY_WARNINGS, &[self.keys.main()]);
        }
        Ok(moved)
    }
}
