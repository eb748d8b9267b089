//! Product image upload and removal

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::error::{HandlerError, ObjectStoreError};
use crate::objects::ObjectStorage;
use crate::service::{parse_body, string_field};

/// Key prefix of every uploaded image
pub const IMAGE_PREFIX: &str = "images";

const UPLOAD_FAILED: &str = "Error uploading image";
const DELETE_FAILED: &str = "Error deleting image";
const MISSING_UPLOAD_FIELDS: &str =
    "Error: The request body must contain image, fileName and contentType.";
const MISSING_IMAGE_REF: &str = "Error: The request body must contain the image url or key.";

/// Where an uploaded image ended up
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub key: String,
    pub url: String,
}

/// Derive the object key of an image from its public URL: the last path
/// segment under [`IMAGE_PREFIX`]
pub fn key_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    if segment.is_empty() {
        return None;
    }
    Some(format!("{}/{}", IMAGE_PREFIX, segment))
}

/// Replace every character that would need escaping in a URL path segment,
/// so [`key_from_url`] recovers the key from the returned URL
fn url_safe_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Uploads product images to object storage and removes them again
#[derive(Clone)]
pub struct ImageService {
    objects: Arc<dyn ObjectStorage>,
    bucket: String,
}

impl ImageService {
    pub fn new(objects: Arc<dyn ObjectStorage>, bucket: &str) -> Self {
        Self {
            objects,
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store a base64 payload under `images/{unix_millis}_{fileName}`.
    ///
    /// Every call creates a new object; identical content is not deduplicated.
    pub fn upload(&self, body: Option<&str>) -> Result<UploadedImage, HandlerError> {
        let body = parse_body(body)?;
        let (encoded, file_name, content_type) = match (
            string_field(&body, "image"),
            string_field(&body, "fileName"),
            string_field(&body, "contentType"),
        ) {
            (Some(image), Some(name), Some(content_type)) => (image, name, content_type),
            _ => return Err(HandlerError::validation(MISSING_UPLOAD_FIELDS)),
        };

        // Only the final path component of the client's file name is kept
        let file_name = file_name
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .map(url_safe_name)
            .ok_or_else(|| HandlerError::validation_with_detail(MISSING_UPLOAD_FIELDS, "invalid fileName"))?;

        // Accept both bare base64 and `data:<type>;base64,<payload>` URLs
        let payload = match encoded.strip_prefix("data:") {
            Some(data_url) => data_url.split_once(',').map(|(_, p)| p).unwrap_or_default(),
            None => encoded,
        };
        let bytes = STANDARD.decode(payload.trim()).map_err(|e| {
            HandlerError::validation_with_detail("Error: The image is not valid base64.", e.to_string())
        })?;

        let key = format!("{}/{}_{}", IMAGE_PREFIX, Utc::now().timestamp_millis(), file_name);
        let url = self
            .objects
            .put_object(&self.bucket, &key, &bytes, content_type)
            .map_err(|e| HandlerError::backend(UPLOAD_FAILED, e))?;

        info!("Uploaded image {} ({} bytes)", key, bytes.len());
        Ok(UploadedImage { key, url })
    }

    /// Remove an image named by `{"url": ...}` or `{"key": ...}`
    pub fn delete(&self, body: Option<&str>) -> Result<String, HandlerError> {
        let body = parse_body(body)?;
        let key = match (string_field(&body, "key"), string_field(&body, "url")) {
            (Some(key), _) => key.to_string(),
            (None, Some(url)) => key_from_url(url)
                .ok_or_else(|| HandlerError::validation(MISSING_IMAGE_REF))?,
            (None, None) => return Err(HandlerError::validation(MISSING_IMAGE_REF)),
        };

        match self.objects.delete_object(&self.bucket, &key) {
            Ok(()) => Ok(key),
            Err(ObjectStoreError::NotFound { .. }) => Err(HandlerError::NotFound(format!(
                "The image {} does not exist.",
                key
            ))),
            Err(e) => Err(HandlerError::backend(DELETE_FAILED, e)),
        }
    }

    /// Remove the image a stored record points at
    pub fn delete_by_url(&self, url: &str) -> Result<String, ObjectStoreError> {
        let key = key_from_url(url).ok_or_else(|| ObjectStoreError::InvalidKey(url.to_string()))?;
        self.objects.delete_object(&self.bucket, &key)?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::mock_store::MockObjectStore;
    use serde_json::json;

    fn service() -> (Arc<MockObjectStore>, ImageService) {
        let store = Arc::new(MockObjectStore::new());
        let images = ImageService::new(store.clone(), "product-images");
        (store, images)
    }

    #[test]
    fn test_key_from_url() {
        assert_eq!(
            key_from_url("https://cdn.example/product-images/images/17_lamp.png").as_deref(),
            Some("images/17_lamp.png")
        );
        assert_eq!(
            key_from_url("mock://b/images/17_lamp.png?v=2").as_deref(),
            Some("images/17_lamp.png")
        );
        assert_eq!(key_from_url("17_lamp.png").as_deref(), Some("images/17_lamp.png"));
        assert!(key_from_url("https://cdn.example/dir/").is_none());
        assert!(key_from_url("").is_none());
    }

    #[test]
    fn test_upload_stores_decoded_bytes() {
        let (store, images) = service();
        let body = json!({
            "image": STANDARD.encode(b"fake png"),
            "fileName": "lamp.png",
            "contentType": "image/png"
        })
        .to_string();

        let uploaded = images.upload(Some(&body)).unwrap();
        assert!(uploaded.key.starts_with("images/"));
        assert!(uploaded.key.ends_with("_lamp.png"));
        assert_eq!(uploaded.url, format!("mock://product-images/{}", uploaded.key));

        let object = store.get_object("product-images", &uploaded.key).unwrap();
        assert_eq!(object.data, b"fake png");
        assert_eq!(object.content_type, "image/png");
    }

    #[test]
    fn test_upload_accepts_data_url_and_strips_directories() {
        let (store, images) = service();
        let body = json!({
            "image": format!("data:image/jpeg;base64,{}", STANDARD.encode(b"jpeg")),
            "fileName": "../../etc/chair.jpg",
            "contentType": "image/jpeg"
        })
        .to_string();

        let uploaded = images.upload(Some(&body)).unwrap();
        assert!(uploaded.key.ends_with("_chair.jpg"));
        assert!(!uploaded.key.contains(".."));
        assert_eq!(store.get_object("product-images", &uploaded.key).unwrap().data, b"jpeg");
    }

    #[test]
    fn test_upload_key_survives_url_round_trip() {
        let (store, images) = service();
        let body = json!({
            "image": STANDARD.encode(b"lamp"),
            "fileName": "lamp #1?v=2 (blue).png",
            "contentType": "image/png"
        })
        .to_string();

        let uploaded = images.upload(Some(&body)).unwrap();
        assert!(uploaded.key.ends_with("_lamp__1_v_2__blue_.png"));
        assert_eq!(key_from_url(&uploaded.url).as_deref(), Some(uploaded.key.as_str()));

        images.delete_by_url(&uploaded.url).unwrap();
        assert_eq!(store.object_count("product-images"), 0);
    }

    #[test]
    fn test_upload_validation() {
        let (store, images) = service();

        let missing = json!({"image": "aGk=", "fileName": "a.png"}).to_string();
        assert_eq!(images.upload(Some(&missing)).unwrap_err().status_code(), 400);

        let bad = json!({"image": "***", "fileName": "a.png", "contentType": "image/png"}).to_string();
        let err = images.upload(Some(&bad)).unwrap_err();
        assert_eq!(err.message(), "Error: The image is not valid base64.");

        assert!(images.upload(None).is_err());
        assert_eq!(store.object_count("product-images"), 0);
    }

    #[test]
    fn test_delete_by_key_and_url() {
        let (store, images) = service();
        store.put_object("product-images", "images/1_a.png", b"a", "image/png").unwrap();
        store.put_object("product-images", "images/2_b.png", b"b", "image/png").unwrap();

        let key = images.delete(Some(r#"{"key": "images/1_a.png"}"#)).unwrap();
        assert_eq!(key, "images/1_a.png");

        let key = images
            .delete(Some(r#"{"url": "mock://product-images/images/2_b.png"}"#))
            .unwrap();
        assert_eq!(key, "images/2_b.png");
        assert_eq!(store.object_count("product-images"), 0);

        let err = images.delete(Some(r#"{"key": "images/1_a.png"}"#)).unwrap_err();
        assert!(matches!(err, HandlerError::NotFound(_)));

        let err = images.delete(Some(r#"{}"#)).unwrap_err();
        assert_eq!(err.message(), MISSING_IMAGE_REF);
    }
}
