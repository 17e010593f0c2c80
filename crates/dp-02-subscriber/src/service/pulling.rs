//! Pull-style subscription loop.

use super::dispatcher::Dispatcher;
use crate::ports::MessageSource;
use shared_bus::StoreError;
use shared_crypto::Encryptor;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How long one pull waits for a message.
pub const DEFAULT_PULL_WAIT: Duration = Duration::from_secs(2);

/// Drains a [`MessageSource`] until it comes up empty.
///
/// A message is acknowledged only when the callback returns true; anything
/// else stays with the source until its reservation lapses.
pub struct PullingSubscriber<S: MessageSource + ?Sized> {
    source: Arc<S>,
    wait: Duration,
    active: AtomicBool,
}

impl<S: MessageSource + ?Sized> PullingSubscriber<S> {
    /// Subscriber over `source` with the default pull wait.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            wait: DEFAULT_PULL_WAIT,
            active: AtomicBool::new(false),
        }
    }

    /// Override the pull wait.
    #[must_use]
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Returns true while a subscription loop should keep pulling.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Mark the subscription active.
    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    /// Make a running loop exit after its current message.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Pull and hand messages to `callback` until a pull returns nothing or
    /// the subscription is deactivated. Returns the number acknowledged.
    ///
    /// Lapsed reservations are reclaimed first, so messages a previous run
    /// failed on are delivered again.
    ///
    /// # Errors
    ///
    /// Stops at the first source failure.
    pub async fn start_subscription<F, Fut>(&self, mut callback: F) -> Result<usize, StoreError>
    where
        F: FnMut(Vec<u8>) -> Fut,
        Fut: Future<Output = bool>,
    {
        let reclaimed = self.source.reclaim().await?;
        if reclaimed > 0 {
            debug!(reclaimed, "Redelivering messages with lapsed reservations");
        }

        self.activate();
        let mut acked = 0;

        while self.is_active() {
            let Some(message) = self.source.pull(self.wait).await? else {
                debug!("Source empty, ending subscription");
                self.deactivate();
                break;
            };

            if callback(message.body.clone()).await {
                self.source.ack(&message).await?;
                acked += 1;
            }
        }

        Ok(acked)
    }

    /// Run a subscription that hands every message to `dispatcher`,
    /// acknowledging those it handled, dropped or skipped.
    pub async fn dispatch_to<E>(&self, dispatcher: &Dispatcher<E>) -> Result<usize, StoreError>
    where
        E: Encryptor + ?Sized,
    {
        self.start_subscription(move |bytes| async move {
            match dispatcher.handle_bytes(&bytes).await {
                Ok(_) => true,
                Err(e) => {
                    warn!(subscriber = %dispatcher.identity(), error = %e, "Message not handled");
                    false
                }
            }
        })
        .await
    }
}
