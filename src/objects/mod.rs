//! Object Storage Abstraction
//!
//! Binary objects (product images) live behind the [`ObjectStorage`] trait so
//! the handlers never depend on a concrete backend.

pub mod local_store;
pub mod mock_store;

use crate::error::ObjectStoreError;

/// Trait defining the object storage interface
pub trait ObjectStorage: Send + Sync {
    /// Store `data` under `bucket/key` and return the object's location URL
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, ObjectStoreError>;

    /// Remove `bucket/key`
    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;
}

/// Reject keys that could escape the bucket when mapped onto a filesystem.
pub(crate) fn check_key(key: &str) -> Result<(), ObjectStoreError> {
    let bad_segment = key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad_segment || key.contains('\\') {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Hex MD5 of the object body, used as its ETag
pub(crate) fn etag(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key() {
        assert!(check_key("images/1700000000000_lamp.png").is_ok());
        assert!(check_key("lamp.png").is_ok());

        assert!(check_key("").is_err());
        assert!(check_key("/abs").is_err());
        assert!(check_key("images/../secret").is_err());
        assert!(check_key("images//double").is_err());
        assert!(check_key("images\\win").is_err());
    }

    #[test]
    fn test_etag() {
        assert_eq!(etag(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }
}
