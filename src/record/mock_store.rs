//! Mock implementation of RecordStore trait for testing

use crate::error::StoreError;
use crate::record::{apply_fields, check_failed, Precondition, Record, RecordKey, RecordStore};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type Tables = HashMap<String, Table>;

/// Rows of one table, kept in insertion order.
#[derive(Default)]
struct Table {
    order: Vec<String>,
    rows: HashMap<String, Record>,
}

impl Table {
    fn insert(&mut self, key: &str, record: Record) {
        if self.rows.insert(key.to_string(), record).is_none() {
            self.order.push(key.to_string());
        }
    }

    fn remove(&mut self, key: &str) -> Option<Record> {
        let removed = self.rows.remove(key);
        if removed.is_some() {
            self.order.retain(|k| k != key);
        }
        removed
    }
}

/// Mock implementation of RecordStore for testing
pub struct MockRecordStore {
    data: Arc<Mutex<Tables>>,
}

impl MockRecordStore {
    /// Create a new, empty mock record store
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.data
            .lock()
            .map_err(|e| StoreError::Backend(format!("mock store lock poisoned: {}", e)))
    }

    /// Clear all tables (useful for test cleanup)
    pub fn clear(&self) {
        if let Ok(mut data) = self.data.lock() {
            data.clear();
        }
    }

    /// Number of records in a table
    pub fn record_count(&self, table: &str) -> usize {
        self.data
            .lock()
            .map(|data| data.get(table).map(|t| t.rows.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of tables that have been written to
    pub fn table_count(&self) -> usize {
        self.data.lock().map(|data| data.len()).unwrap_or(0)
    }
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MockRecordStore {
    fn get(&self, table: &str, key: RecordKey<'_>) -> Result<Option<Record>, StoreError> {
        let data = self.lock()?;
        Ok(data
            .get(table)
            .and_then(|t| t.rows.get(key.value))
            .cloned())
    }

    fn put(&self, table: &str, key: RecordKey<'_>, item: &Record) -> Result<(), StoreError> {
        let mut data = self.lock()?;
        data.entry(table.to_string())
            .or_default()
            .insert(key.value, item.clone());
        debug!("Mock: put {}={} into {}", key.field, key.value, table);
        Ok(())
    }

    fn update(
        &self,
        table: &str,
        key: RecordKey<'_>,
        fields: &Record,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let mut data = self.lock()?;
        let existing = match precondition {
            Precondition::KeyExists => data
                .get_mut(table)
                .and_then(|t| t.rows.get_mut(key.value))
                .ok_or_else(|| check_failed(table, key))?,
        };
        apply_fields(existing, fields);
        debug!("Mock: updated {}={} in {}", key.field, key.value, table);
        Ok(())
    }

    fn delete(
        &self,
        table: &str,
        key: RecordKey<'_>,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let mut data = self.lock()?;
        match precondition {
            Precondition::KeyExists => data
                .get_mut(table)
                .and_then(|t| t.remove(key.value))
                .ok_or_else(|| check_failed(table, key))?,
        };
        debug!("Mock: deleted {}={} from {}", key.field, key.value, table);
        Ok(())
    }

    fn scan(&self, table: &str) -> Result<Vec<Record>, StoreError> {
        let data = self.lock()?;
        Ok(data
            .get(table)
            .map(|t| {
                t.order
                    .iter()
                    .filter_map(|k| t.rows.get(k).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::keyed_record;
    use serde_json::json;

    fn record(id: &str, name: &str) -> Record {
        let mut r = keyed_record(RecordKey::new("id", id));
        r.insert("name".into(), json!(name));
        r
    }

    #[test]
    fn test_mock_record_store_basic_operations() {
        let store = MockRecordStore::new();
        let key = RecordKey::new("id", "r1");

        // Initially empty
        assert_eq!(store.table_count(), 0);
        assert!(store.get("Products", key).unwrap().is_none());
        assert!(store.scan("Products").unwrap().is_empty());

        // Put and get
        store.put("Products", key, &record("r1", "lamp")).unwrap();
        assert_eq!(store.record_count("Products"), 1);
        let fetched = store.get("Products", key).unwrap().unwrap();
        assert_eq!(fetched["name"], json!("lamp"));

        // Conditional update keeps unnamed attributes
        let mut fields = Record::new();
        fields.insert("price".into(), json!(10));
        store.update("Products", key, &fields, Precondition::KeyExists).unwrap();
        let fetched = store.get("Products", key).unwrap().unwrap();
        assert_eq!(fetched["name"], json!("lamp"));
        assert_eq!(fetched["price"], json!(10));

        // Conditional delete
        store.delete("Products", key, Precondition::KeyExists).unwrap();
        assert!(store.get("Products", key).unwrap().is_none());
        assert_eq!(store.record_count("Products"), 0);

        // Clear
        store.put("Products", key, &record("r1", "lamp")).unwrap();
        store.clear();
        assert_eq!(store.table_count(), 0);
    }

    #[test]
    fn test_mock_record_store_conditional_failures() {
        let store = MockRecordStore::new();
        let key = RecordKey::new("id", "missing");

        let result = store.update("Links", key, &Record::new(), Precondition::KeyExists);
        assert!(matches!(result, Err(StoreError::ConditionalCheckFailed { .. })));
        // The failed update must not have created anything, not even the table
        assert!(store.get("Links", key).unwrap().is_none());
        assert_eq!(store.table_count(), 0);

        let result = store.delete("Links", key, Precondition::KeyExists);
        assert!(matches!(result, Err(StoreError::ConditionalCheckFailed { .. })));
        assert_eq!(store.table_count(), 0);

        // A missing key in an existing table is rejected the same way
        store.put("Links", RecordKey::new("id", "other"), &record("other", "x")).unwrap();
        let result = store.update("Links", key, &Record::new(), Precondition::KeyExists);
        assert!(matches!(result, Err(StoreError::ConditionalCheckFailed { .. })));
        assert_eq!(store.record_count("Links"), 1);
    }

    #[test]
    fn test_mock_record_store_scan_keeps_insertion_order() {
        let store = MockRecordStore::new();
        for id in ["c", "a", "b"] {
            store.put("T", RecordKey::new("id", id), &record(id, id)).unwrap();
        }
        // Replacing an existing row must not move it
        store.put("T", RecordKey::new("id", "c"), &record("c", "again")).unwrap();

        let ids: Vec<_> = store
            .scan("T")
            .unwrap()
            .into_iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
