//! Object-store transfers via server-side presigned URLs.
//!
//! The worker never signs anything locally: it asks the storage API for a
//! presigned URL scoped to one operation on one key, then performs the
//! plain HTTP transfer against that URL. Every operation runs under the
//! exponential-backoff wrapper.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::retry::{with_exponential_backoff, RetryPolicy};

pub const DEFAULT_PRESIGN_EXPIRY_SECONDS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub api_endpoint: String,
    pub api_key: String,
    pub region: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOperation {
    Upload,
    Download,
    Delete,
}

impl ObjectOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectOperation::Upload => "upload",
            ObjectOperation::Download => "download",
            ObjectOperation::Delete => "delete",
        }
    }
}

#[derive(Serialize)]
struct PresignRequest<'a> {
    operation: &'a str,
    key: &'a str,
    expires_in_seconds: u64,
}

#[derive(Deserialize)]
struct PresignResponse {
    url: String,
}

pub struct ObjectClient {
    config: StorageConfig,
    client: reqwest::Client,
    objects_dir: PathBuf,
    retry: RetryPolicy,
}

impl ObjectClient {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StorageError::Http(e.to_string()))?;
        Ok(Self {
            config,
            client,
            objects_dir: Self::default_objects_dir(),
            retry: RetryPolicy::default(),
        })
    }

    /// `$HOME/.splitup/objects`, where downloaded blobs land.
    pub fn default_objects_dir() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".splitup").join("objects"))
            .unwrap_or_else(|| PathBuf::from(".splitup").join("objects"))
    }

    pub fn with_objects_dir(mut self, dir: PathBuf) -> Self {
        self.objects_dir = dir;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Whether an object with this key has already been downloaded. A plain
    /// path check; there is no remote index to consult.
    pub fn is_downloaded(&self, key: &str) -> bool {
        self.objects_dir.join(basename(key)).exists()
    }

    /// Ask the storage API to sign one operation on one key.
    pub async fn presigned_url(
        &self,
        key: &str,
        operation: ObjectOperation,
        expires_in_seconds: u64,
    ) -> Result<String, StorageError> {
        debug!(
            "Generating presigned URL for {} operation on {}/{}",
            operation.as_str(),
            self.config.bucket,
            key
        );
        let response = self
            .client
            .post(format!("{}/presign", self.config.api_endpoint))
            .bearer_auth(&self.config.api_key)
            .json(&PresignRequest {
                operation: operation.as_str(),
                key,
                expires_in_seconds,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Api(format!(
                "presign returned status {} for {}",
                response.status().as_u16(),
                key
            )));
        }
        let presigned: PresignResponse = response.json().await?;
        Ok(presigned.url)
    }

    /// Download an object into the objects directory.
    pub async fn get_object(&self, key: &str) -> Result<PathBuf, StorageError> {
        let filename = basename(key);
        with_exponential_backoff(
            || async {
                let url = self
                    .presigned_url(key, ObjectOperation::Download, DEFAULT_PRESIGN_EXPIRY_SECONDS)
                    .await?;
                self.fetch_url_to(&url, &filename).await
            },
            &format!("download object {}", key),
            self.retry,
        )
        .await
    }

    /// Upload a local file under `key`; returns the canonical s3 URI.
    pub async fn put_object(
        &self,
        key: &str,
        file_path: &Path,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<String, StorageError> {
        let body = tokio::fs::read(file_path).await?;
        info!(
            "Uploading {:?} ({} bytes) to {}/{}",
            file_path,
            body.len(),
            self.config.bucket,
            key
        );

        with_exponential_backoff(
            || async {
                let url = self
                    .presigned_url(key, ObjectOperation::Upload, DEFAULT_PRESIGN_EXPIRY_SECONDS)
                    .await?;
                let mut request = self.client.put(&url).body(body.clone());
                if let Some(metadata) = metadata {
                    for (name, value) in metadata {
                        let header = format!("x-amz-meta-{}", name);
                        request = request.header(header.as_str(), value.as_str());
                    }
                }
                let response = request.send().await?;
                if !response.status().is_success() {
                    return Err(StorageError::Status {
                        status: response.status().as_u16(),
                        context: key.to_string(),
                    });
                }
                Ok(format!("s3://{}/{}", self.config.bucket, key))
            },
            &format!("upload object {}", key),
            self.retry,
        )
        .await
    }

    /// Delete the object under `key`.
    pub async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        with_exponential_backoff(
            || async {
                let url = self
                    .presigned_url(key, ObjectOperation::Delete, DEFAULT_PRESIGN_EXPIRY_SECONDS)
                    .await?;
                let response = self.client.delete(&url).send().await?;
                if !response.status().is_success() {
                    return Err(StorageError::Status {
                        status: response.status().as_u16(),
                        context: key.to_string(),
                    });
                }
                Ok(())
            },
            &format!("delete object {}", key),
            self.retry,
        )
        .await
    }

    /// Download from an already-resolved URL into the objects directory.
    pub async fn download_from_url(
        &self,
        url: &str,
        local_filename: Option<&str>,
    ) -> Result<PathBuf, StorageError> {
        let filename = local_filename
            .map(|name| name.to_string())
            .unwrap_or_else(|| basename(url));
        with_exponential_backoff(
            || async { self.fetch_url_to(url, &filename).await },
            &format!("download {}", url),
            self.retry,
        )
        .await
    }

    async fn fetch_url_to(&self, url: &str, filename: &str) -> Result<PathBuf, StorageError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Status {
                status: response.status().as_u16(),
                context: url.to_string(),
            });
        }
        let content = response.bytes().await?;

        tokio::fs::create_dir_all(&self.objects_dir).await?;
        let local_path = self.objects_dir.join(filename);
        tokio::fs::write(&local_path, &content).await?;
        debug!("Downloaded {} bytes to {:?}", content.len(), local_path);
        Ok(local_path)
    }
}

fn basename(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}
