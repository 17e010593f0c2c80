//! # Encrypted `Envelope`
//!
//! The universal wire record carried end-to-end by every transport.
//!
//! ## Wire Properties
//!
//! - **Fixed field set**: `uuid`, `salt`, `iv`, `ciphertext`, `owner_info?`,
//!   `type_info`, `topic`, `event_type`, `api_key`.
//! - **Event codes**: `event_type` is carried as its integer code
//!   (0=CREATED, 1=UPDATED, 2=DELETED).
//! - **Binary form**: raw bytes for `salt`/`iv`/`ciphertext` (`encode`).
//! - **Text form**: the same three fields as base64 (`to_json`), for
//!   transports that are not binary-safe.

use crate::errors::EnvelopeError;
use crate::version::SchemaType;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use std::fmt;

/// The kind of change a payload describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum EventType {
    /// A record was created.
    Created = 0,
    /// A record was updated.
    Updated = 1,
    /// A record was deleted.
    Deleted = 2,
}

impl From<EventType> for u8 {
    fn from(event_type: EventType) -> Self {
        event_type as u8
    }
}

impl TryFrom<u8> for EventType {
    type Error = EnvelopeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Created),
            1 => Ok(Self::Updated),
            2 => Ok(Self::Deleted),
            other => Err(EnvelopeError::UnknownEventType(other)),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Deleted => "DELETED",
        };
        f.write_str(name)
    }
}

/// The encrypted, versioned wire record.
///
/// Built once by the encryptor, transmitted, and decrypted once by a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    // =========================================================================
    // IDENTITY
    // =========================================================================
    /// Unique message identifier (UUID v4 string).
    pub uuid: String,

    // =========================================================================
    // CIPHER SECTION
    // =========================================================================
    /// Key-derivation salt (16 bytes).
    pub salt: Vec<u8>,

    /// Cipher initialization vector.
    pub iv: Vec<u8>,

    /// Encrypted payload bytes.
    pub ciphertext: Vec<u8>,

    // =========================================================================
    // ROUTING SECTION
    // =========================================================================
    /// Optional identifier of the owning principal.
    pub owner_info: Option<String>,

    /// Fully-qualified payload schema type, e.g. `Order_1_1`.
    pub type_info: String,

    /// Logical destination queue/stream name.
    pub topic: String,

    /// What happened to the record.
    pub event_type: EventType,

    /// Application-level credential checked by subscribers.
    pub api_key: String,
}

/// Base64 text rendition of [`Envelope`].
#[serde_as]
#[derive(Serialize, Deserialize)]
struct TextEnvelope {
    uuid: String,
    #[serde_as(as = "Base64")]
    salt: Vec<u8>,
    #[serde_as(as = "Base64")]
    iv: Vec<u8>,
    #[serde_as(as = "Base64")]
    ciphertext: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_info: Option<String>,
    type_info: String,
    topic: String,
    event_type: EventType,
    #[serde(default)]
    api_key: String,
}

impl Envelope {
    /// Serialize to the compact binary form.
    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        bincode::serialize(self).map_err(|e| EnvelopeError::Encoding(e.to_string()))
    }

    /// Deserialize from the compact binary form.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        bincode::deserialize(bytes).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }

    /// Serialize to the base64 text form.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        let text = TextEnvelope {
            uuid: self.uuid.clone(),
            salt: self.salt.clone(),
            iv: self.iv.clone(),
            ciphertext: self.ciphertext.clone(),
            owner_info: self.owner_info.clone(),
            type_info: self.type_info.clone(),
            topic: self.topic.clone(),
            event_type: self.event_type,
            api_key: self.api_key.clone(),
        };
        serde_json::to_string(&text).map_err(|e| EnvelopeError::Encoding(e.to_string()))
    }

    /// Deserialize from the base64 text form.
    pub fn from_json(text: &str) -> Result<Self, EnvelopeError> {
        let text: TextEnvelope =
            serde_json::from_str(text).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
        Ok(Self {
            uuid: text.uuid,
            salt: text.salt,
            iv: text.iv,
            ciphertext: text.ciphertext,
            owner_info: text.owner_info,
            type_info: text.type_info,
            topic: text.topic,
            event_type: text.event_type,
            api_key: text.api_key,
        })
    }

    /// The envelope topic, or an error if it is empty.
    pub fn require_topic(&self) -> Result<&str, EnvelopeError> {
        if self.topic.trim().is_empty() {
            return Err(EnvelopeError::MissingTopic {
                uuid: self.uuid.clone(),
            });
        }
        Ok(&self.topic)
    }

    /// Parse `type_info` as a versioned schema type, if it is one.
    #[must_use]
    pub fn schema_type(&self) -> Option<SchemaType> {
        self.type_info.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::PipelineVersion;

    fn sample() -> Envelope {
        Envelope {
            uuid: "3f2b6c1e-6a59-4b8e-9a53-2d8f4f4f7d10".to_string(),
            salt: vec![0x00, 0xFF, 0x10, 0x7F],
            iv: vec![0xAB; 16],
            ciphertext: vec![0x00, 0x01, 0xFE, 0xFF, 0x80],
            owner_info: Some("user-42".to_string()),
            type_info: "Order_1_1".to_string(),
            topic: "orders".to_string(),
            event_type: EventType::Updated,
            api_key: "123XYZ".to_string(),
        }
    }

    #[test]
    fn test_binary_form_preserves_raw_bytes() {
        let envelope = sample();
        let bytes = envelope.encode().unwrap();
        assert_eq!(Envelope::decode(&bytes).unwrap(), envelope);
    }

    #[test]
    fn test_text_form_uses_base64_and_codes() {
        let envelope = sample();
        let text = envelope.to_json().unwrap();

        let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw["event_type"], 1);
        assert_eq!(raw["iv"], "q6urq6urq6urq6urq6urqw==");

        assert_eq!(Envelope::from_json(&text).unwrap(), envelope);
    }

    #[test]
    fn test_event_type_codes() {
        assert_eq!(u8::from(EventType::Created), 0);
        assert_eq!(u8::from(EventType::Updated), 1);
        assert_eq!(u8::from(EventType::Deleted), 2);
        assert_eq!(EventType::try_from(2).unwrap(), EventType::Deleted);
        assert_eq!(
            EventType::try_from(7),
            Err(EnvelopeError::UnknownEventType(7))
        );
    }

    #[test]
    fn test_unknown_event_code_is_malformed() {
        let text = sample().to_json().unwrap().replace("\"event_type\":1", "\"event_type\":9");
        assert!(matches!(
            Envelope::from_json(&text),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(Envelope::decode(b"not an envelope").is_err());
        assert!(Envelope::from_json("{}").is_err());
    }

    #[test]
    fn test_require_topic() {
        let mut envelope = sample();
        assert_eq!(envelope.require_topic().unwrap(), "orders");

        envelope.topic = "  ".to_string();
        assert!(matches!(
            envelope.require_topic(),
            Err(EnvelopeError::MissingTopic { .. })
        ));
    }

    #[test]
    fn test_schema_type() {
        let schema = sample().schema_type().unwrap();
        assert_eq!(schema.base(), "Order");
        assert_eq!(schema.version(), PipelineVersion::new(1, 1));
    }
}
