//! In-memory `RecordStore`.

use crate::domain::{HandlerError, Record};
use crate::ports::RecordStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Table -> id -> record.
type Tables = HashMap<String, HashMap<String, Record>>;

/// Record store kept in process memory. Used in tests and as a reference
/// for real persistence adapters.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `table`.
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, HashMap::len)
    }

    /// Returns true if `table` holds no records.
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Snapshot of one record.
    pub fn get(&self, table: &str, id: &str) -> Option<Record> {
        self.tables.read().get(table)?.get(id).cloned()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find(&self, table: &str, id: &str) -> Result<Option<Record>, HandlerError> {
        Ok(self.get(table, id))
    }

    async fn insert(&self, table: &str, record: Record) -> Result<Record, HandlerError> {
        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        if rows.contains_key(&record.id) {
            return Err(HandlerError::Store(format!(
                "{table} record {} already exists",
                record.id
            )));
        }
        rows.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(&self, table: &str, record: Record) -> Result<Record, HandlerError> {
        let mut tables = self.tables.write();
        let existing = tables
            .get_mut(table)
            .and_then(|rows| rows.get_mut(&record.id))
            .ok_or_else(|| HandlerError::NotFound {
                table: table.to_string(),
                id: record.id.clone(),
            })?;
        existing.attributes.extend(record.attributes);
        Ok(existing.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<Record, HandlerError> {
        self.tables
            .write()
            .get_mut(table)
            .and_then(|rows| rows.remove(id))
            .ok_or_else(|| HandlerError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            })
    }
}
