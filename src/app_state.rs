//! Application State Management
//!
//! This module provides the application state that owns the record store,
//! object storage and id generator, following the dependency injection
//! pattern. Services are cheap views built per request from these handles.

use std::sync::Arc;
use log::info;

use crate::config::{AppConfig, ObjectBackend, RecordBackend};
use crate::ids::{IdGenerator, UuidGenerator};
use crate::objects::{local_store::LocalObjectStore, mock_store::MockObjectStore, ObjectStorage};
use crate::record::{mock_store::MockRecordStore, sqlite_store::SQLiteRecordStore, RecordStore};
use crate::schema::ResourceKind;
use crate::service::crud::CrudService;
use crate::service::images::ImageService;

/// Application state containing the injected backends
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub objects: Arc<dyn ObjectStorage>,
    pub ids: Arc<dyn IdGenerator>,
    pub config: AppConfig,
}

impl AppState {
    /// Assemble state from explicitly constructed backends
    pub fn new(
        config: AppConfig,
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStorage>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            records,
            objects,
            ids,
            config,
        }
    }

    /// Create application state with backends chosen by configuration
    pub fn from_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application state with configuration");

        let records: Arc<dyn RecordStore> = match config.records.backend {
            RecordBackend::SQLite => {
                info!(
                    "Using SQLite record backend with db_path: {}, wal_mode: {}",
                    config.records.db_path, config.records.wal_mode
                );
                Arc::new(SQLiteRecordStore::open(&config.records.db_path, config.records.wal_mode)?)
            }
            RecordBackend::Mock => {
                info!("Using in-memory record backend");
                Arc::new(MockRecordStore::new())
            }
        };

        let objects: Arc<dyn ObjectStorage> = match config.objects.backend {
            ObjectBackend::Local => {
                info!(
                    "Using local object backend with base_path: {}, bucket: {}",
                    config.objects.base_path, config.objects.images_bucket
                );
                Arc::new(LocalObjectStore::from_config(&config.objects)?)
            }
            ObjectBackend::Mock => {
                info!("Using in-memory object backend");
                Arc::new(MockObjectStore::new())
            }
        };

        info!("Application state initialized successfully");
        Ok(Self::new(config, records, objects, Arc::new(UuidGenerator)))
    }

    /// Create application state for testing with mock backends
    pub fn new_for_testing() -> Self {
        let mut config = AppConfig::default();
        config.records.backend = RecordBackend::Mock;
        config.objects.backend = ObjectBackend::Mock;
        Self::new(
            config,
            Arc::new(MockRecordStore::new()),
            Arc::new(MockObjectStore::new()),
            Arc::new(UuidGenerator),
        )
    }

    /// Image service bound to the configured images bucket
    pub fn images(&self) -> ImageService {
        ImageService::new(self.objects.clone(), &self.config.objects.images_bucket)
    }

    /// CRUD service for one resource
    pub fn crud(&self, kind: ResourceKind) -> CrudService {
        CrudService::new(
            kind.schema(),
            self.config.table_for(kind),
            self.records.clone(),
            self.ids.clone(),
            self.images(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_crud_uses_configured_table() {
        let mut state = AppState::new_for_testing();
        state
            .config
            .tables
            .insert("orders".to_string(), "ShopOrders".to_string());

        assert_eq!(state.crud(ResourceKind::Order).table(), "ShopOrders");
        assert_eq!(state.crud(ResourceKind::Review).table(), "ReviewsTable");
        assert_eq!(state.crud(ResourceKind::Customer).schema().key_field, "idCustomer");
    }

    #[test]
    fn test_from_config_with_on_disk_backends() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.records.db_path = dir.path().join("db/records.sqlite").display().to_string();
        config.objects.base_path = dir.path().join("objects").display().to_string();

        let state = AppState::from_config(config).unwrap();
        let created = state
            .crud(ResourceKind::Customer)
            .insert(Some(r#"{"cedula":"9","name":"Eva","address":"Main St"}"#))
            .unwrap();
        assert_eq!(state.crud(ResourceKind::Customer).select().unwrap(), vec![created]);
        assert!(dir.path().join("objects").exists());
    }
}
