//! S3-compatible object storage for uploaded documents.
//!
//! Works against AWS S3, MinIO, and Google Cloud Storage's XML API
//! (HMAC interoperability keys). Objects are private; clients get at
//! them through the API or through short-lived presigned URLs.

use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::config::{StorageConfig, StorageProvider};
use crate::core::error::AppError;

/// Downloaded object bytes with the content type the store reported
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

pub struct ObjectStorage {
    bucket: Box<Bucket>,
    provider: StorageProvider,
    presigned_url_expiry_secs: u32,
}

impl ObjectStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create storage credentials: {}", e)))?;

        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse::<Region>()
                .map_err(|e| AppError::Internal(format!("Invalid storage region: {}", e)))?,
        };

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| AppError::Internal(format!("Failed to open bucket: {}", e)))?;

        // Custom endpoints (MinIO, GCS) are addressed as endpoint/bucket
        if config.endpoint.is_some() {
            bucket.set_path_style();
        }

        info!(
            "Object storage initialized: provider={:?}, bucket={}",
            config.provider,
            bucket.name()
        );

        Ok(Self {
            bucket,
            provider: config.provider,
            presigned_url_expiry_secs: config.presigned_url_expiry_secs,
        })
    }

    pub fn provider(&self) -> StorageProvider {
        self.provider
    }

    pub fn presigned_url_expiry_secs(&self) -> u32 {
        self.presigned_url_expiry_secs
    }

    pub async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), AppError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| storage_error("upload", key, e))?;

        check_status(response.status_code(), "upload", key)?;
        debug!("Uploaded '{}' ({} bytes)", key, data.len());
        Ok(())
    }

    pub async fn download(&self, key: &str) -> Result<StoredObject, AppError> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| storage_error("download", key, e))?;

        if response.status_code() == 404 {
            return Err(AppError::NotFound(format!("Stored file '{}' not found", key)));
        }
        check_status(response.status_code(), "download", key)?;

        let content_type = response.headers().get("content-type").cloned();
        Ok(StoredObject {
            data: response.to_vec(),
            content_type,
        })
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| storage_error("delete", key, e))?;

        // Deleting a missing object is not an error for S3 semantics
        if response.status_code() != 404 {
            check_status(response.status_code(), "delete", key)?;
        }
        debug!("Deleted '{}'", key);
        Ok(())
    }

    /// Time-limited GET URL for a stored object
    pub async fn presigned_url(&self, key: &str) -> Result<String, AppError> {
        self.bucket
            .presign_get(key, self.presigned_url_expiry_secs, None)
            .await
            .map_err(|e| storage_error("presign", key, e))
    }
}

/// Object key for a new document upload:
/// `private/service-requests/<request id>/<category>/<uuid>.<ext>`
pub fn document_key(service_request_id: Uuid, category: &str, file_name: &str) -> String {
    let id = Uuid::new_v4();
    match extension(file_name) {
        Some(ext) => format!("private/service-requests/{service_request_id}/{category}/{id}.{ext}"),
        None => format!("private/service-requests/{service_request_id}/{category}/{id}"),
    }
}

fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn storage_error(action: &str, key: &str, e: impl std::fmt::Display) -> AppError {
    tracing::error!("Storage {} failed for '{}': {}", action, key, e);
    AppError::ExternalService(format!("Failed to {} file", action))
}

fn check_status(status: u16, action: &str, key: &str) -> Result<(), AppError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(storage_error(action, key, format!("HTTP {}", status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_key_layout() {
        let request_id = Uuid::new_v4();
        let key = document_key(request_id, "identity", "Passport Scan.PDF");

        let prefix = format!("private/service-requests/{request_id}/identity/");
        assert!(key.starts_with(&prefix));
        assert!(key.ends_with(".pdf"));
        assert!(!key.contains(' '));
    }

    #[test]
    fn test_extension_rules() {
        assert_eq!(extension("a.PNG").as_deref(), Some("png"));
        assert_eq!(extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension(".env"), None);
        assert_eq!(extension("noext"), None);
        assert_eq!(extension("weird.p/f"), None);
    }

    #[test]
    fn test_new_with_custom_endpoint() {
        let config = StorageConfig {
            provider: StorageProvider::Gcs,
            endpoint: Some("https://storage.googleapis.com".to_string()),
            access_key: "GOOG1EXAMPLE".to_string(),
            secret_key: "secret".to_string(),
            bucket: "docs".to_string(),
            region: "auto".to_string(),
            presigned_url_expiry_secs: 600,
        };

        let storage = ObjectStorage::new(&config).unwrap();
        assert_eq!(storage.provider(), StorageProvider::Gcs);
        assert_eq!(storage.presigned_url_expiry_secs(), 600);
    }
}
