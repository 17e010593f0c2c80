//! `TopicResolver` implementations.

use crate::domain::RouteError;
use crate::ports::TopicResolver;
use shared_types::{payload_class_and_version, Envelope, TopicNaming};
use std::collections::HashMap;

/// Forwards to the topic the producer stamped on the envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeTopic;

impl TopicResolver for EnvelopeTopic {
    fn resolve(&self, envelope: &Envelope) -> Result<String, RouteError> {
        envelope
            .require_topic()
            .map(str::to_string)
            .map_err(|_| RouteError::MissingTopic {
                uuid: envelope.uuid.clone(),
            })
    }
}

/// Derives the topic from the payload class and version in `type_info`.
///
/// `"Order_1_1"` with `Order` mapped to table `orders` and prefix `pipeline`
/// resolves to `"pipeline-v1-orders"`.
#[derive(Debug, Clone, Default)]
pub struct SchemaTopics {
    naming: TopicNaming,
    tables: HashMap<String, String>,
}

impl SchemaTopics {
    /// Resolver with the given naming scheme and no classes.
    pub fn new(naming: TopicNaming) -> Self {
        Self {
            naming,
            tables: HashMap::new(),
        }
    }

    /// Map payload class `class` to record table `table`.
    #[must_use]
    pub fn with_table(mut self, class: impl Into<String>, table: impl Into<String>) -> Self {
        self.tables.insert(class.into(), table.into());
        self
    }
}

impl TopicResolver for SchemaTopics {
    fn resolve(&self, envelope: &Envelope) -> Result<String, RouteError> {
        let (class, version) = payload_class_and_version(&envelope.type_info);
        let version =
            version.ok_or_else(|| RouteError::MissingVersion(envelope.type_info.clone()))?;
        let table = self
            .tables
            .get(class)
            .ok_or_else(|| RouteError::UnknownClass(class.to_string()))?;
        Ok(self.naming.topic_name(version, table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::EventType;

    fn envelope(type_info: &str, topic: &str) -> Envelope {
        Envelope {
            uuid: "u-1".to_string(),
            salt: vec![0; 16],
            iv: vec![0; 16],
            ciphertext: vec![1, 2, 3],
            owner_info: None,
            type_info: type_info.to_string(),
            topic: topic.to_string(),
            event_type: EventType::Created,
            api_key: "k".to_string(),
        }
    }

    #[test]
    fn test_envelope_topic() {
        assert_eq!(
            EnvelopeTopic.resolve(&envelope("Order_1_0", "orders")).unwrap(),
            "orders"
        );
        assert_eq!(
            EnvelopeTopic.resolve(&envelope("Order_1_0", "  ")),
            Err(RouteError::MissingTopic {
                uuid: "u-1".to_string()
            })
        );
    }

    #[test]
    fn test_schema_topics() {
        let resolver = SchemaTopics::new(TopicNaming::new("harrys-test"))
            .with_table("DefaultEmitter", "default_emitters");
        assert_eq!(
            resolver
                .resolve(&envelope("DefaultEmitter_1_0", ""))
                .unwrap(),
            "harrys-test-v1-default_emitters"
        );
        assert_eq!(
            resolver.resolve(&envelope("DefaultEmitter_2_3", "")).unwrap(),
            "harrys-test-v2-default_emitters"
        );
    }

    #[test]
    fn test_schema_topics_errors() {
        let resolver = SchemaTopics::default().with_table("Order", "orders");
        assert_eq!(
            resolver.resolve(&envelope("Order", "")),
            Err(RouteError::MissingVersion("Order".to_string()))
        );
        assert_eq!(
            resolver.resolve(&envelope("Invoice_1_0", "")),
            Err(RouteError::UnknownClass("Invoice".to_string()))
        );
    }
}
