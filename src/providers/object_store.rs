//! Object-store collaborator: uploads image bytes extracted during parsing
//! and returns a URL the caller can embed in chunk output.

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use uuid::Uuid;

use crate::document::{StorageConfig, StorageProvider};
use crate::error::{Error, Result};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload_bytes(&self, content: &[u8], file_ext: &str) -> Result<String>;
    async fn upload_file(&self, file_path: &Path) -> Result<String>;
    fn name(&self) -> &str;
}

/// Writes under a configured base directory and returns the resulting path.
pub struct LocalObjectStore {
    image_dir: std::path::PathBuf,
}

impl LocalObjectStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let image_dir = base_dir.as_ref().join("images");
        std::fs::create_dir_all(&image_dir)?;
        Ok(Self { image_dir })
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload_bytes(&self, content: &[u8], file_ext: &str) -> Result<String> {
        let ext = file_ext.trim_start_matches('.');
        let path = self.image_dir.join(format!("{}.{ext}", Uuid::new_v4()));
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| Error::storage(e.to_string()))?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn upload_file(&self, file_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(file_path)
            .await
            .map_err(|e| Error::storage(e.to_string()))?;
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        self.upload_bytes(&bytes, ext).await
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Embeds the payload directly as a `data:` URL rather than uploading
/// anywhere — useful for tests and for deployments without object storage.
pub struct Base64ObjectStore;

#[async_trait]
impl ObjectStore for Base64ObjectStore {
    async fn upload_bytes(&self, content: &[u8], file_ext: &str) -> Result<String> {
        let ext = file_ext.trim_start_matches('.');
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        Ok(format!("data:image/{ext};base64,{encoded}"))
    }

    async fn upload_file(&self, file_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(file_path)
            .await
            .map_err(|e| Error::storage(e.to_string()))?;
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png");
        self.upload_bytes(&bytes, ext).await
    }

    fn name(&self) -> &str {
        "base64"
    }
}

/// S3-compatible object store, shared by the `cos` and `minio` providers —
/// both speak the S3 HTTP API, so one client covers both given the right
/// endpoint/region/credentials.
pub struct S3CompatibleObjectStore {
    store: object_store::aws::AmazonS3,
    public_base_url: String,
    path_prefix: String,
}

impl S3CompatibleObjectStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let store = object_store::aws::AmazonS3Builder::new()
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region)
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket_name)
            .with_allow_http(true)
            .build()
            .map_err(|e| Error::storage(e.to_string()))?;

        Ok(Self {
            store,
            public_base_url: config.endpoint.clone(),
            path_prefix: config.path_prefix.trim_matches('/').to_string(),
        })
    }

    fn object_key(&self, ext: &str) -> String {
        let ext = ext.trim_start_matches('.');
        if self.path_prefix.is_empty() {
            format!("images/{}.{ext}", Uuid::new_v4())
        } else {
            format!("{}/images/{}.{ext}", self.path_prefix, Uuid::new_v4())
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for S3CompatibleObjectStore {
    async fn upload_bytes(&self, content: &[u8], file_ext: &str) -> Result<String> {
        let key = self.object_key(file_ext);
        self.store
            .put(
                &object_store::path::Path::from(key.clone()),
                bytes::Bytes::copy_from_slice(content).into(),
            )
            .await
            .map_err(|e| Error::storage(e.to_string()))?;
        Ok(self.public_url(&key))
    }

    async fn upload_file(&self, file_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(file_path)
            .await
            .map_err(|e| Error::storage(e.to_string()))?;
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        self.upload_bytes(&bytes, ext).await
    }

    fn name(&self) -> &str {
        "s3-compatible"
    }
}

/// Builds the configured object-store backend. `cos` and `minio` both map to
/// [`S3CompatibleObjectStore`] since neither the Tencent COS nor MinIO SDK is
/// part of this crate's dependency stack; both speak the S3 API, so pointing
/// the shared S3 client at the right endpoint covers both.
pub fn create_object_store(config: &StorageConfig) -> Result<Box<dyn ObjectStore>> {
    match config.provider {
        StorageProvider::Local => Ok(Box::new(LocalObjectStore::new(
            if config.base_dir.is_empty() {
                "."
            } else {
                &config.base_dir
            },
        )?)),
        StorageProvider::Base64 => Ok(Box::new(Base64ObjectStore)),
        StorageProvider::Cos | StorageProvider::Minio => {
            Ok(Box::new(S3CompatibleObjectStore::new(config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn base64_store_round_trips_payload() {
        let store = Base64ObjectStore;
        let url = store.upload_bytes(b"hello", "png").await.unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn local_store_writes_file_under_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).unwrap();
        let path = store.upload_bytes(b"hello", ".png").await.unwrap();
        assert!(std::path::Path::new(&path).exists());
    }
}
