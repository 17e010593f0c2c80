//! # Registration Table
//!
//! Maps payload schema types to the target (and optional handler) that
//! receives them. Built once at startup, then shared read-only by every
//! dispatcher through an `Arc`.
//!
//! Lookup by received `type_info`:
//!
//! 1. exact registration
//! 2. otherwise the first registered type, in registration order, with the
//!    same base name and major version

use crate::domain::{Schema, Target};
use crate::ports::PayloadHandler;
use shared_types::SchemaType;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One registered payload type.
#[derive(Clone)]
pub struct Registration {
    /// How payloads of this type are parsed.
    pub schema: Schema,
    /// Where they are delivered.
    pub target: Target,
    /// Handler taking precedence over the target's own methods.
    pub handler: Option<Arc<dyn PayloadHandler>>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("schema", &self.schema)
            .field("target", &self.target)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Payload type -> (target, handler).
#[derive(Debug, Default, Clone)]
pub struct Registry {
    order: Vec<SchemaType>,
    entries: HashMap<SchemaType, Registration>,
}

impl Registry {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` against `target`, optionally with a handler.
    ///
    /// Registering a type again replaces its entry but keeps its original
    /// position for major-version fallback.
    pub fn register(
        &mut self,
        schema: impl Into<Schema>,
        target: impl Into<Target>,
        handler: Option<Arc<dyn PayloadHandler>>,
    ) -> &mut Self {
        let schema = schema.into();
        let key = schema.schema_type().clone();
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(
            key,
            Registration {
                schema,
                target: target.into(),
                handler,
            },
        );
        self
    }

    /// Register a known type that nothing claims; its messages are dropped
    /// after parsing.
    pub fn register_schema(&mut self, schema: impl Into<Schema>) -> &mut Self {
        self.register(schema, Target::None, None)
    }

    /// The exact registration for `schema_type`.
    pub fn registration(&self, schema_type: &SchemaType) -> Option<&Registration> {
        self.entries.get(schema_type)
    }

    /// Target registered for exactly `schema_type`.
    pub fn target_for(&self, schema_type: &SchemaType) -> Option<&Target> {
        self.registration(schema_type).map(|r| &r.target)
    }

    /// Handler registered for exactly `schema_type`.
    pub fn handler_for(&self, schema_type: &SchemaType) -> Option<&Arc<dyn PayloadHandler>> {
        self.registration(schema_type)?.handler.as_ref()
    }

    /// The schema to parse a `type_info` payload with.
    ///
    /// Returns `None` when `type_info` is not a versioned type name or no
    /// compatible type is registered.
    pub fn resolve_schema(&self, type_info: &str) -> Option<&Schema> {
        let wanted: SchemaType = type_info.parse().ok()?;
        if let Some(exact) = self.entries.get(&wanted) {
            return Some(&exact.schema);
        }
        self.order
            .iter()
            .find(|registered| registered.is_compatible_with(&wanted))
            .and_then(|registered| self.entries.get(registered))
            .map(|r| &r.schema)
    }

    /// Registered types in registration order.
    pub fn schema_types(&self) -> impl Iterator<Item = &SchemaType> {
        self.order.iter()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
