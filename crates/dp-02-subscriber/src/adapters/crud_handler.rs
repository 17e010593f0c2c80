//! Create/update/delete handler over a `RecordStore`.
//!
//! | Event | Behavior |
//! |-------|----------|
//! | CREATED | Insert unless a record with the id exists; return the record |
//! | UPDATED | Insert if missing, else overwrite when the payload's `updated_at` is not older |
//! | DELETED | Delete; a missing record is `HandlerError::NotFound` |
//!
//! Numeric attributes whose names end in `_at` are epoch seconds and are
//! stored as RFC 3339 timestamps.

use crate::domain::{HandlerError, Payload, Record, Target};
use crate::ports::{PayloadHandler, RecordStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use shared_types::EventType;
use std::sync::Arc;
use tracing::debug;

/// Persists payloads into the table named after their target.
pub struct CrudHandler<S: RecordStore + ?Sized> {
    store: Arc<S>,
}

impl<S: RecordStore + ?Sized> CrudHandler<S> {
    /// Handler writing to `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn create(&self, table: &str, record: Record) -> Result<Record, HandlerError> {
        match self.store.find(table, &record.id).await? {
            Some(existing) => Ok(existing),
            None => self.store.insert(table, record).await,
        }
    }

    async fn update(
        &self,
        table: &str,
        record: Record,
        payload_updated_at: i64,
    ) -> Result<Record, HandlerError> {
        let Some(existing) = self.store.find(table, &record.id).await? else {
            return self.store.insert(table, record).await;
        };

        let stored_updated_at = existing.get("updated_at").map_or(0, epoch_seconds);
        if payload_updated_at >= stored_updated_at {
            self.store.update(table, record).await
        } else {
            debug!(
                table,
                id = %existing.id,
                payload_updated_at,
                stored_updated_at,
                "Ignoring stale update"
            );
            Ok(existing)
        }
    }
}

#[async_trait]
impl<S: RecordStore + ?Sized> PayloadHandler for CrudHandler<S> {
    async fn handle_payload(
        &self,
        payload: &Payload,
        target: &Target,
        event_type: EventType,
    ) -> Result<Option<Record>, HandlerError> {
        let table = target
            .name()
            .ok_or_else(|| HandlerError::InvalidState("payload has no target table".to_string()))?;
        let id = payload
            .id()
            .ok_or_else(|| HandlerError::InvalidState(format!("{} payload has no id", payload.schema)))?;

        let record = match event_type {
            EventType::Created => self.create(table, to_record(&id, payload)?).await?,
            EventType::Updated => {
                let updated_at = payload.field("updated_at").map_or(0, epoch_seconds);
                self.update(table, to_record(&id, payload)?, updated_at)
                    .await?
            }
            EventType::Deleted => self.store.delete(table, &id).await?,
        };
        Ok(Some(record))
    }
}

fn to_record(id: &str, payload: &Payload) -> Result<Record, HandlerError> {
    let Value::Object(body) = &payload.body else {
        return Err(HandlerError::InvalidState(format!(
            "{} payload is not an object",
            payload.schema
        )));
    };
    Ok(Record::new(id, normalize_timestamps(body)))
}

/// Replace epoch-second `*_at` attributes with RFC 3339 strings.
pub(crate) fn normalize_timestamps(attributes: &Map<String, Value>) -> Map<String, Value> {
    attributes
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::Number(_) if name.ends_with("_at") => {
                    DateTime::<Utc>::from_timestamp(epoch_seconds(value), 0)
                        .map_or_else(|| value.clone(), |at| Value::String(at.to_rfc3339()))
                }
                _ => value.clone(),
            };
            (name.clone(), value)
        })
        .collect()
}

/// Whole seconds since the epoch for a numeric or RFC 3339 value; 0 otherwise.
fn epoch_seconds(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => DateTime::parse_from_rfc3339(s).map_or(0, |at| at.timestamp()),
        _ => 0,
    }
}
