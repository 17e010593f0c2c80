//! Stored records produced by handlers.

use serde_json::{Map, Value};

/// A persisted record: an id plus its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Primary key, as text.
    pub id: String,
    /// Column values, including `id`.
    pub attributes: Map<String, Value>,
}

impl Record {
    /// Create a record.
    pub fn new(id: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// Attribute `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}
