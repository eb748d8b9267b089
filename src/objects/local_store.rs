//! Local filesystem object storage implementation
//!
//! Objects are written to `<base_path>/<bucket>/<key>`. The returned URL is
//! `<public_url>/<bucket>/<key>`, so a static file server (or CDN) mounted on
//! `base_path` serves them back.

use crate::config::ObjectsConfig;
use crate::error::ObjectStoreError;
use crate::objects::{check_key, etag, ObjectStorage};
use log::{info, warn};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Local filesystem object store
pub struct LocalObjectStore {
    base_path: PathBuf,
    public_url: String,
}

impl LocalObjectStore {
    pub fn new(base_path: impl Into<PathBuf>, public_url: &str) -> Result<Self, ObjectStoreError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        info!("Using local object storage directory: {}", base_path.display());
        Ok(Self {
            base_path,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ObjectsConfig) -> Result<Self, ObjectStoreError> {
        Self::new(&config.base_path, &config.public_url)
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, ObjectStoreError> {
        check_key(bucket)?;
        check_key(key)?;
        Ok(self.base_path.join(bucket).join(key))
    }
}

fn write_then_rename(tmp_path: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
    {
        let mut file = fs::File::create(tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(tmp_path, path)
}

impl ObjectStorage for LocalObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, ObjectStoreError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to a temp sibling and rename so readers never see a partial object
        let mut tmp_name = path.clone().into_os_string();
        tmp_name.push(".partial");
        let tmp_path = PathBuf::from(tmp_name);
        if let Err(e) = write_then_rename(&tmp_path, &path, data) {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
                }
            }
            return Err(e.into());
        }

        info!(
            "Stored object {}/{} ({} bytes, {}, etag {})",
            bucket,
            key,
            data.len(),
            content_type,
            etag(data)
        );
        Ok(format!("{}/{}/{}", self.public_url, bucket, key))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted object {}/{}", bucket, key);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Object {}/{} not found on delete", bucket, key);
                Err(ObjectStoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
