//! Store keys derived from a main queue name.

/// Every store key one forwarder touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    main: String,
    in_progress: String,
    lock: String,
    dead_letter: String,
}

impl QueueKeys {
    /// Keys for the main queue `queue`.
    pub fn new(queue: &str) -> Self {
        let in_progress = format!("{queue}_in_progress");
        Self {
            main: queue.to_string(),
            lock: format!("{in_progress}__lock"),
            dead_letter: format!("{queue}__dead"),
            in_progress,
        }
    }

    /// Main queue producers push onto.
    pub fn main(&self) -> &str {
        &self.main
    }

    /// List holding messages currently being forwarded.
    pub fn in_progress(&self) -> &str {
        &self.in_progress
    }

    /// Sweep lock key.
    pub fn lock(&self) -> &str {
        &self.lock
    }

    /// List receiving in-progress entries that can never be forwarded.
    pub fn dead_letter(&self) -> &str {
        &self.dead_letter
    }

    /// Claim key for the message `uuid`.
    pub fn claim(&self, uuid: &str) -> String {
        format!("{}__{}", self.main, uuid)
    }
}
