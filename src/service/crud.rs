//! Generic CRUD service
//!
//! One [`CrudService`] instance serves one resource type; everything that
//! differs between resources comes from its [`ResourceSchema`].
//!
//! Update and delete follow the conditional mutation protocol: the write is
//! guarded by "key exists", so a record that is absent, or removed by a
//! concurrent request, is reported as not found and never resurrected.
//! Reads that precede a write (admin guard, delete confirmation) are not
//! atomic with it.

use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{HandlerError, StoreError};
use crate::ids::IdGenerator;
use crate::record::{keyed_record, Precondition, Record, RecordKey, RecordStore};
use crate::schema::{MutationGuard, ResourceSchema};
use crate::service::images::ImageService;
use crate::service::{parse_body, string_field};

const INSERT_FAILED: &str = "Error inserting data";
const SELECT_FAILED: &str = "Error selecting data";
const UPDATE_FAILED: &str = "Error updating data";
const DELETE_FAILED: &str = "Error deleting data";
const UNEXPECTED_DATA: &str = "Error: The request body does not contain the expected data.";

/// CRUD operations over one resource table
pub struct CrudService {
    schema: &'static ResourceSchema,
    table: String,
    records: Arc<dyn RecordStore>,
    ids: Arc<dyn IdGenerator>,
    images: ImageService,
}

impl CrudService {
    pub fn new(
        schema: &'static ResourceSchema,
        table: &str,
        records: Arc<dyn RecordStore>,
        ids: Arc<dyn IdGenerator>,
        images: ImageService,
    ) -> Self {
        Self {
            schema,
            table: table.to_string(),
            records,
            ids,
            images,
        }
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn not_found(&self) -> HandlerError {
        HandlerError::NotFound(format!(
            "The item with the provided {} does not exist.",
            self.schema.key_field
        ))
    }

    fn missing_key(&self) -> HandlerError {
        HandlerError::validation(format!(
            "Error: The request body must contain the {}.",
            self.schema.key_field
        ))
    }

    fn key_of<'a>(&self, body: &'a Record) -> Result<&'a str, HandlerError> {
        string_field(body, self.schema.key_field).ok_or_else(|| self.missing_key())
    }

    /// Read the current record, mapping absence to not-found
    fn fetch_existing(&self, key: RecordKey<'_>, failure: &str) -> Result<Record, HandlerError> {
        self.records
            .get(&self.table, key)
            .map_err(|e| HandlerError::backend(failure, e))?
            .ok_or_else(|| self.not_found())
    }

    /// Create a record from the declared fields of `body` under a fresh key.
    ///
    /// There is no existence check: the key comes from the id generator and
    /// the write is an unconditional put.
    pub fn insert(&self, body: Option<&str>) -> Result<Record, HandlerError> {
        let body = parse_body(body)?;
        self.schema
            .validate(&body)
            .map_err(|violation| HandlerError::validation_with_detail(UNEXPECTED_DATA, violation.to_string()))?;

        let id = self.ids.generate();
        let key = RecordKey::new(self.schema.key_field, &id);

        let mut record = keyed_record(key);
        record.extend(self.schema.project(&body));

        self.records
            .put(&self.table, key, &record)
            .map_err(|e| HandlerError::backend(INSERT_FAILED, e))?;

        info!("Inserted {}={} into {}", key.field, id, self.table);
        Ok(record)
    }

    /// Every record of the table, unfiltered
    pub fn select(&self) -> Result<Vec<Record>, HandlerError> {
        let records = self
            .records
            .scan(&self.table)
            .map_err(|e| HandlerError::backend(SELECT_FAILED, e))?;
        debug!("Scanned {} records from {}", records.len(), self.table);
        Ok(records)
    }

    /// Replace every declared field of an existing record.
    ///
    /// Fields the caller omits are written as `null`. The returned record is
    /// the key plus the fields as submitted, not a re-read of the store.
    pub fn update(&self, body: Option<&str>) -> Result<Record, HandlerError> {
        let body = parse_body(body)?;
        let id = self.key_of(&body)?;
        let key = RecordKey::new(self.schema.key_field, id);

        if self.schema.guard != MutationGuard::None {
            let current = self.fetch_existing(key, UPDATE_FAILED)?;
            if self.schema.guard.forbids(&current) {
                return Err(HandlerError::Forbidden(
                    "You cannot update the default owner administrator.".to_string(),
                ));
            }
        }

        let fields = self.schema.project(&body);
        match self
            .records
            .update(&self.table, key, &fields, Precondition::KeyExists)
        {
            Ok(()) => {}
            Err(StoreError::ConditionalCheckFailed { .. }) => {
                debug!("Update of {}={} in {} failed its existence check", key.field, id, self.table);
                return Err(self.not_found());
            }
            Err(e) => return Err(HandlerError::backend(UPDATE_FAILED, e)),
        }

        info!("Updated {}={} in {}", key.field, id, self.table);
        let mut updated = keyed_record(key);
        updated.extend(fields);
        Ok(updated)
    }

    /// Remove a record and return its last stored values.
    ///
    /// The key comes from `path_key` when given, otherwise from the body.
    pub fn delete(&self, path_key: Option<&str>, body: Option<&str>) -> Result<Record, HandlerError> {
        let id = match path_key.filter(|k| !k.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let body = parse_body(body)?;
                self.key_of(&body)?.to_string()
            }
        };
        let key = RecordKey::new(self.schema.key_field, &id);

        let current = self.fetch_existing(key, DELETE_FAILED)?;
        if self.schema.guard.forbids(&current) {
            return Err(HandlerError::Forbidden(
                "You cannot delete the default owner administrator.".to_string(),
            ));
        }

        match self
            .records
            .delete(&self.table, key, Precondition::KeyExists)
        {
            Ok(()) => {}
            Err(StoreError::ConditionalCheckFailed { .. }) => {
                debug!("{}={} vanished from {} before delete", key.field, id, self.table);
                return Err(self.not_found());
            }
            Err(e) => return Err(HandlerError::backend(DELETE_FAILED, e)),
        }
        info!("Deleted {}={} from {}", key.field, id, self.table);

        if let Some(field) = self.schema.image_field {
            if let Some(url) = current.get(field).and_then(Value::as_str) {
                // Best effort: the record is already gone either way
                match self.images.delete_by_url(url) {
                    Ok(image_key) => info!("Removed image {} of {}={}", image_key, key.field, id),
                    Err(e) => warn!("Could not remove image {} of {}={}: {}", url, key.field, id, e),
                }
            }
        }

        Ok(current)
    }
}
