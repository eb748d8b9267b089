//! Mock implementation of ObjectStorage trait for testing

use crate::error::ObjectStoreError;
use crate::objects::{check_key, etag, ObjectStorage};
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// An object held by the mock store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub etag: String,
}

/// Mock implementation of ObjectStorage for testing
pub struct MockObjectStore {
    // bucket -> key -> object
    data: Arc<Mutex<HashMap<String, HashMap<String, StoredObject>>>>,
    fail_deletes: bool,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            fail_deletes: false,
        }
    }

    /// A store whose deletes always fail, for exercising best-effort cleanup paths
    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::new()
        }
    }

    /// Fetch a stored object
    pub fn get_object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let data = self.data.lock().ok()?;
        data.get(bucket).and_then(|objects| objects.get(key)).cloned()
    }

    /// Check if an object exists
    pub fn object_exists(&self, bucket: &str, key: &str) -> bool {
        self.get_object(bucket, key).is_some()
    }

    /// Number of objects in a bucket
    pub fn object_count(&self, bucket: &str) -> usize {
        self.data
            .lock()
            .map(|data| data.get(bucket).map(|objects| objects.len()).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStorage for MockObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, ObjectStoreError> {
        check_key(key)?;
        let object = StoredObject {
            data: data.to_vec(),
            content_type: content_type.to_string(),
            etag: etag(data),
        };

        let mut store = self
            .data
            .lock()
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        store
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);

        info!("Mock: stored {} bytes at {}/{}", data.len(), bucket, key);
        Ok(format!("mock://{}/{}", bucket, key))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        if self.fail_deletes {
            return Err(ObjectStoreError::Backend("delete disabled".to_string()));
        }

        let mut store = self
            .data
            .lock()
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        match store.get_mut(bucket).and_then(|objects| objects.remove(key)) {
            Some(_) => {
                info!("Mock: deleted {}/{}", bucket, key);
                Ok(())
            }
            None => Err(ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
        }
    }
}
