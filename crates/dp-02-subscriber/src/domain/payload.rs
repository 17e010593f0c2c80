//! Decoded payloads.

use shared_types::SchemaType;
use serde_json::Value;

/// A decrypted, parsed payload together with the schema it was parsed as.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Schema the bytes were parsed with (may differ in minor version from
    /// the envelope's `type_info`).
    pub schema: SchemaType,
    /// Parsed body.
    pub body: Value,
}

impl Payload {
    /// Create a payload.
    pub fn new(schema: SchemaType, body: Value) -> Self {
        Self { schema, body }
    }

    /// Top-level field `name`, if the body is an object that has it.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// The `id` field rendered as text (numbers and strings only).
    pub fn id(&self) -> Option<String> {
        match self.field("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> SchemaType {
        "Order_1_0".parse().unwrap()
    }

    #[test]
    fn test_id_from_number_or_string() {
        assert_eq!(
            Payload::new(schema(), json!({"id": 42})).id(),
            Some("42".to_string())
        );
        assert_eq!(
            Payload::new(schema(), json!({"id": "a-1"})).id(),
            Some("a-1".to_string())
        );
        assert_eq!(Payload::new(schema(), json!({"id": null})).id(), None);
        assert_eq!(Payload::new(schema(), json!([1, 2])).id(), None);
    }
}
