//! Results of one forwarder iteration and one failure sweep.

/// What one `process_queue` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The blocking pop timed out on an empty queue.
    Idle,
    /// Published and removed from the in-progress queue.
    Forwarded { uuid: String, topic: String },
    /// Bytes could not be decoded; left on the in-progress queue.
    Undecodable,
    /// No destination could be computed; left on the in-progress queue.
    Unroutable { uuid: String },
    /// Forwarding failed; the message was put back on the main queue.
    Requeued { uuid: String, reason: String },
}

impl IterationOutcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Forwarded { .. } => "forwarded",
            Self::Undecodable => "undecodable",
            Self::Unroutable { .. } => "unroutable",
            Self::Requeued { .. } => "requeued",
        }
    }
}

/// What one `check_for_failures` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Another worker holds the sweep lock; nothing was scanned.
    pub locked_out: bool,
    /// Entries examined.
    pub scanned: usize,
    /// Abandoned entries moved back to the main queue.
    pub reclaimed: usize,
    /// Entries left alone because a live claim exists.
    pub owned: usize,
    /// Entries moved to the dead-letter list.
    pub dead_lettered: usize,
}
