//! Application Configuration
//!
//! This module provides configuration management for the application,
//! supporting YAML configuration files with sensible defaults and a handful
//! of environment variable overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use log::{info, warn};

use crate::schema::ResourceKind;

/// Record store backend types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub enum RecordBackend {
    #[default]
    SQLite,
    Mock,
}

impl std::str::FromStr for RecordBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(RecordBackend::SQLite),
            "mock" | "memory" => Ok(RecordBackend::Mock),
            _ => Err(format!("Unknown record backend: {}", s)),
        }
    }
}

/// Object storage backend types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub enum ObjectBackend {
    #[default]
    Local,
    Mock,
}

impl std::str::FromStr for ObjectBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "filesystem" => Ok(ObjectBackend::Local),
            "mock" | "memory" => Ok(ObjectBackend::Mock),
            _ => Err(format!("Unknown object backend: {}", s)),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Record store configuration
    pub records: RecordsConfig,
    /// Object storage configuration
    pub objects: ObjectsConfig,
    /// Table name overrides, keyed by resource slug
    pub tables: HashMap<String, String>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Maximum request payload size in bytes
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9710,
            workers: 4,
            max_payload_size: 16 * 1024 * 1024,
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    pub backend: RecordBackend,
    /// Database file path (SQLite backend)
    pub db_path: String,
    /// Enable WAL mode (SQLite backend)
    pub wal_mode: bool,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            backend: RecordBackend::SQLite,
            db_path: "./data/records.sqlite".to_string(),
            wal_mode: true,
        }
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectsConfig {
    pub backend: ObjectBackend,
    /// Root directory for the local backend
    pub base_path: String,
    /// Prefix of the URLs handed back for stored objects
    pub public_url: String,
    /// Bucket holding product images
    pub images_bucket: String,
}

impl Default for ObjectsConfig {
    fn default() -> Self {
        Self {
            backend: ObjectBackend::Local,
            base_path: "./data/objects".to_string(),
            public_url: "http://127.0.0.1:9710/objects".to_string(),
            images_bucket: "product-images".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to the log4rs configuration file
    pub config_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            config_file: "server_log.yaml".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `$APP_CONFIG` (default `config.yaml`), use
    /// defaults if not found, then apply environment overrides
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("APP_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
        let mut config = Self::from_file(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// Read a YAML file; a missing file yields the defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: AppConfig = serde_yaml::from_str(&content)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Apply `RECORD_BACKEND`, `OBJECT_BACKEND`, `DB_FILE`, `IMAGES_BUCKET`
    /// and the per-resource `*_TABLE` variables
    pub fn apply_env(&mut self) {
        if let Ok(value) = env::var("RECORD_BACKEND") {
            match value.parse() {
                Ok(backend) => {
                    info!("Using record backend from environment: {:?}", backend);
                    self.records.backend = backend;
                }
                Err(e) => warn!("Invalid record backend in environment: {}. Keeping {:?}.", e, self.records.backend),
            }
        }
        if let Ok(value) = env::var("OBJECT_BACKEND") {
            match value.parse() {
                Ok(backend) => {
                    info!("Using object backend from environment: {:?}", backend);
                    self.objects.backend = backend;
                }
                Err(e) => warn!("Invalid object backend in environment: {}. Keeping {:?}.", e, self.objects.backend),
            }
        }
        if let Ok(path) = env::var("DB_FILE") {
            info!("Using database path from environment: {}", path);
            self.records.db_path = path;
        }
        if let Ok(bucket) = env::var("IMAGES_BUCKET") {
            self.objects.images_bucket = bucket;
        }
        for kind in ResourceKind::ALL {
            if let Ok(table) = env::var(kind.schema().table_env) {
                self.tables.insert(kind.slug().to_string(), table);
            }
        }
    }

    /// Table name backing a resource
    pub fn table_for(&self, kind: ResourceKind) -> &str {
        self.tables
            .get(kind.slug())
            .map(String::as_str)
            .unwrap_or(kind.schema().default_table)
    }
}
