//! Registered payload schemas and their parsers.

use super::errors::ParseError;
use super::payload::Payload;
use serde_json::Value;
use shared_types::SchemaType;
use std::fmt;
use std::sync::Arc;

/// Turns decrypted bytes into a payload body.
pub type ParseFn = Arc<dyn Fn(&[u8]) -> Result<Value, ParseError> + Send + Sync>;

/// A payload schema type the subscriber knows how to parse.
#[derive(Clone)]
pub struct Schema {
    schema_type: SchemaType,
    parser: ParseFn,
}

impl Schema {
    /// A schema whose payloads are JSON documents.
    pub fn json(schema_type: SchemaType) -> Self {
        Self::with_parser(schema_type, |bytes| {
            serde_json::from_slice(bytes).map_err(|e| ParseError(e.to_string()))
        })
    }

    /// A schema with a custom parser.
    pub fn with_parser<F>(schema_type: SchemaType, parser: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Value, ParseError> + Send + Sync + 'static,
    {
        Self {
            schema_type,
            parser: Arc::new(parser),
        }
    }

    /// The schema type.
    pub fn schema_type(&self) -> &SchemaType {
        &self.schema_type
    }

    /// Parse `bytes` as this schema.
    pub fn parse(&self, bytes: &[u8]) -> Result<Payload, ParseError> {
        let body = (self.parser)(bytes)?;
        Ok(Payload::new(self.schema_type.clone(), body))
    }
}

impl From<SchemaType> for Schema {
    fn from(schema_type: SchemaType) -> Self {
        Self::json(schema_type)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("schema_type", &self.schema_type)
            .finish()
    }
}
