//! Message parameters.

use shared_crypto::EncryptOptions;
use shared_types::EventType;

/// What happened to a model, as seen by the code that saved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Created,
    Updated,
    Destroyed,
}

impl From<Change> for EventType {
    fn from(change: Change) -> Self {
        match change {
            Change::Created => EventType::Created,
            Change::Updated => EventType::Updated,
            Change::Destroyed => EventType::Deleted,
        }
    }
}

/// Everything needed to build one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageParams {
    /// Destination topic.
    pub topic: String,
    /// Payload schema type, e.g. `Order_1_1`.
    pub type_info: String,
    /// Plaintext payload bytes.
    pub payload: Vec<u8>,
    /// Change kind.
    pub event_type: EventType,
    /// Optional owning principal.
    pub owner_info: Option<String>,
}

impl MessageParams {
    /// Parameters without owner information.
    pub fn new(
        topic: impl Into<String>,
        type_info: impl Into<String>,
        payload: impl Into<Vec<u8>>,
        event_type: EventType,
    ) -> Self {
        Self {
            topic: topic.into(),
            type_info: type_info.into(),
            payload: payload.into(),
            event_type,
            owner_info: None,
        }
    }

    /// Attach owner information.
    #[must_use]
    pub fn with_owner(mut self, owner_info: impl Into<String>) -> Self {
        self.owner_info = Some(owner_info.into());
        self
    }

    /// Encryption options carrying this message's routing metadata.
    pub fn encrypt_options(&self) -> EncryptOptions {
        let options = EncryptOptions::new(&self.topic, &self.type_info, self.event_type);
        match &self.owner_info {
            Some(owner) => options.with_owner(owner),
            None => options,
        }
    }
}
