//! `MessageSource` over a durable list.
//!
//! | Key | Contents |
//! |-----|----------|
//! | `<queue>` | Messages waiting to be pulled |
//! | `<queue>_in_progress` | Pulled, unacknowledged messages |
//! | `<queue>_in_progress__<sha1>` | Reservation, TTL = reservation timeout |
//!
//! A pulled message is reserved for a fixed time. Once the reservation
//! lapses without an ack, [`MessageSource::reclaim`] returns it to the back
//! of the queue for another delivery.

use crate::ports::{MessageSource, PulledMessage};
use async_trait::async_trait;
use sha1::{Digest, Sha1};
use shared_bus::{ListStore, StoreError};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a pulled message stays reserved before it is redelivered.
pub const DEFAULT_RESERVATION: Duration = Duration::from_secs(60);

/// Pulls from the tail of a list, parking each message on
/// `<queue>_in_progress` until it is acknowledged or its reservation lapses.
pub struct ListMessageSource<S: ListStore + ?Sized> {
    store: Arc<S>,
    queue: String,
    in_progress: String,
    reservation: Duration,
}

impl<S: ListStore + ?Sized> ListMessageSource<S> {
    /// Source reading `queue`.
    pub fn new(store: Arc<S>, queue: impl Into<String>) -> Self {
        let queue = queue.into();
        let in_progress = format!("{queue}_in_progress");
        Self {
            store,
            queue,
            in_progress,
            reservation: DEFAULT_RESERVATION,
        }
    }

    /// Override the reservation timeout.
    #[must_use]
    pub fn with_reservation(mut self, reservation: Duration) -> Self {
        self.reservation = reservation;
        self
    }

    /// The queue being read.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Where pulled, unacknowledged messages wait.
    pub fn in_progress_queue(&self) -> &str {
        &self.in_progress
    }

    /// Reservation key for `body`. Identical bodies share one reservation.
    fn reservation_key(&self, body: &[u8]) -> String {
        let digest = Sha1::digest(body);
        let mut key = format!("{}__", self.in_progress);
        for byte in digest {
            let _ = write!(key, "{byte:02x}");
        }
        key
    }
}

#[async_trait]
impl<S: ListStore + ?Sized> MessageSource for ListMessageSource<S> {
    async fn pull(&self, wait: Duration) -> Result<Option<PulledMessage>, StoreError> {
        let Some(body) = self
            .store
            .brpoplpush(&self.queue, &self.in_progress, wait)
            .await?
        else {
            return Ok(None);
        };

        self.store
            .set_ex(&self.reservation_key(&body), b"reserved", self.reservation)
            .await?;
        Ok(Some(PulledMessage { body }))
    }

    async fn ack(&self, message: &PulledMessage) -> Result<(), StoreError> {
        let removed = self.store.lrem(&self.in_progress, 1, &message.body).await?;
        if removed != 1 {
            warn!(
                queue = %self.in_progress,
                removed,
                "Acknowledged message was not in progress"
            );
        }
        self.store.del(&self.reservation_key(&message.body)).await?;
        Ok(())
    }

    async fn reclaim(&self) -> Result<usize, StoreError> {
        let mut reclaimed = 0;
        for body in self.store.lrange(&self.in_progress, 0, -1).await? {
            if self.store.get(&self.reservation_key(&body)).await?.is_some() {
                continue;
            }
            // Back of the line: consumers pop from the tail.
            if self.store.move_one(&self.in_progress, &self.queue, &body).await? {
                reclaimed += 1;
            }
        }

        if reclaimed > 0 {
            info!(queue = %self.queue, reclaimed, "Returned expired reservations to the queue");
        } else {
            debug!(queue = %self.queue, "No expired reservations");
        }
        Ok(reclaimed)
    }
}
