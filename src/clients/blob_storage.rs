use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};
use crate::models::EvidenceUpload;
use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::info;

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store the upload in `bucket` and return its public URL
    async fn put(&self, bucket: &str, upload: &EvidenceUpload) -> AppResult<String>;
}

/// Content-addressed object name: the same image always lands on the same key
pub fn object_name(upload: &EvidenceUpload) -> String {
    let digest = hex::encode(Sha256::digest(&upload.bytes));
    match upload.extension() {
        Some(ext) => format!("{}.{}", &digest[..32], ext),
        None => digest[..32].to_string(),
    }
}

/// Object storage reached over its REST API
/// (`POST {base}/storage/v1/object/{bucket}/{name}`)
pub struct HttpBlobStorage {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBlobStorage {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Option<Self> {
        let url = config.url.as_ref()?;
        Some(Self::new(url.clone(), config.api_key.clone()))
    }

    pub fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, name)
    }
}

#[async_trait]
impl BlobStorage for HttpBlobStorage {
    async fn put(&self, bucket: &str, upload: &EvidenceUpload) -> AppResult<String> {
        let name = object_name(upload);
        let mut request = self
            .client
            .post(format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, name))
            .header("content-type", upload.content_type.as_str())
            .header("x-upsert", "true")
            .body(upload.bytes.clone());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key).header("apikey", key.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload to {} failed: {}", bucket, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "Upload to {} returned {}",
                bucket,
                response.status()
            )));
        }

        Ok(self.public_url(bucket, &name))
    }
}

/// Writes objects under a local directory, one subdirectory per bucket
pub struct DirectoryBlobStorage {
    root: PathBuf,
    public_base: String,
}

impl DirectoryBlobStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStorage for DirectoryBlobStorage {
    async fn put(&self, bucket: &str, upload: &EvidenceUpload) -> AppResult<String> {
        let name = object_name(upload);
        let dir = self.root.join(bucket);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot create {}: {}", dir.display(), e)))?;
        tokio::fs::write(dir.join(&name), &upload.bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot write {}/{}: {}", bucket, name, e)))?;

        info!("Stored {} bytes as {}/{}", upload.bytes.len(), bucket, name);
        Ok(format!("{}/{}/{}", self.public_base, bucket, name))
    }
}
