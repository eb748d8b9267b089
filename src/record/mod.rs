//! Record Store Abstraction
//!
//! This module provides an abstraction over the key-value/document store that
//! holds the resource tables, so the handlers can run against SQLite, an
//! in-memory store, or any other backend implementing [`RecordStore`].

pub mod sqlite_store;
pub mod mock_store;

use serde_json::{Map, Value};

use crate::error::StoreError;

/// One row/document of a resource table.
pub type Record = Map<String, Value>;

/// Identifies a record inside a table: the key attribute name and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKey<'a> {
    pub field: &'a str,
    pub value: &'a str,
}

impl<'a> RecordKey<'a> {
    pub fn new(field: &'a str, value: &'a str) -> Self {
        Self { field, value }
    }
}

/// Guard evaluated atomically with a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Fail with [`StoreError::ConditionalCheckFailed`] unless the key is present.
    KeyExists,
}

/// Trait defining the record store interface.
///
/// Every method is a single atomic call against the backend.
pub trait RecordStore: Send + Sync {
    /// Fetch a record, `None` when the key is absent.
    fn get(&self, table: &str, key: RecordKey<'_>) -> Result<Option<Record>, StoreError>;

    /// Insert or replace a whole record.
    fn put(&self, table: &str, key: RecordKey<'_>, item: &Record) -> Result<(), StoreError>;

    /// Set `fields` on the record, leaving attributes not named in `fields` intact.
    /// A missing record is never created.
    fn update(
        &self,
        table: &str,
        key: RecordKey<'_>,
        fields: &Record,
        precondition: Precondition,
    ) -> Result<(), StoreError>;

    /// Remove a record.
    fn delete(
        &self,
        table: &str,
        key: RecordKey<'_>,
        precondition: Precondition,
    ) -> Result<(), StoreError>;

    /// Every record of the table, in insertion order.
    fn scan(&self, table: &str) -> Result<Vec<Record>, StoreError>;
}

/// Apply SET semantics: overwrite each field of `fields` on `target`.
pub(crate) fn apply_fields(target: &mut Record, fields: &Record) {
    for (name, value) in fields {
        target.insert(name.clone(), value.clone());
    }
}

/// Error for a write whose precondition did not hold.
pub(crate) fn check_failed(table: &str, key: RecordKey<'_>) -> StoreError {
    StoreError::ConditionalCheckFailed {
        table: table.to_string(),
        key: key.value.to_string(),
    }
}

/// A fresh record holding only the key attribute.
pub(crate) fn keyed_record(key: RecordKey<'_>) -> Record {
    let mut record = Record::new();
    record.insert(key.field.to_string(), Value::String(key.value.to_string()));
    record
}
