//! Content-addressed local cache for task graphs and weight bundles.
//!
//! Identity is the content hash, never the file name: a lookup hashes every
//! candidate in the class directory, and a download is verified against the
//! requested id before it is renamed into place. That makes mirroring the
//! same artifacts across many worker nodes idempotent without a central
//! catalog.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StorageError;
use crate::id::artifact_id;

/// The two artifact classes, each with its own directory, file extension,
/// and id length convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Serialized graph programs, addressed by the 8-hex truncated id.
    Task,
    /// Weight bundles, addressed by the full UUID-formatted id.
    Safetensors,
}

impl ArtifactKind {
    fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Task => "tasks",
            ArtifactKind::Safetensors => "safetensors",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Task => "graph",
            ArtifactKind::Safetensors => "safetensors",
        }
    }
}

pub struct ArtifactStore {
    root: PathBuf,
    client: reqwest::Client,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StorageError::Http(e.to_string()))?;
        Ok(Self { root, client })
    }

    /// `$HOME/.tinygrad`, the directory task graphs and weight bundles are
    /// mirrored into.
    pub fn default_root() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".tinygrad"))
            .unwrap_or_else(|| PathBuf::from(".tinygrad"))
    }

    /// Resolve an artifact to a local path, downloading on miss when `url`
    /// is given. A download whose contents do not hash to `id` is deleted
    /// and reported as an integrity error.
    pub async fn fetch(
        &self,
        kind: ArtifactKind,
        id: &str,
        url: Option<&str>,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.root.join(kind.dir_name());
        tokio::fs::create_dir_all(&dir).await?;

        if let Some(path) = self.find_matching(&dir, kind, id).await? {
            debug!("Artifact {} already cached at {:?}", id, path);
            return Ok(path);
        }

        if let Some(url) = url {
            return self.download_and_verify(&dir, kind, id, url).await;
        }

        Err(StorageError::NotFound(id.to_string()))
    }

    /// Scan the class directory for any file whose content hash matches.
    async fn find_matching(
        &self,
        dir: &Path,
        kind: ArtifactKind,
        id: &str,
    ) -> Result<Option<PathBuf>, StorageError> {
        let truncate = id.len() == 8;
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(kind.extension()) {
                continue;
            }
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("temp_"))
            {
                continue;
            }
            let data = tokio::fs::read(&path).await?;
            if artifact_id(&data, truncate) == id {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    async fn download_and_verify(
        &self,
        dir: &Path,
        kind: ArtifactKind,
        id: &str,
        url: &str,
    ) -> Result<PathBuf, StorageError> {
        reqwest::Url::parse(url).map_err(|e| StorageError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        info!("Downloading artifact {} from {}", id, url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Status {
                status: response.status().as_u16(),
                context: url.to_string(),
            });
        }
        let data = response.bytes().await?;

        let temp_path = dir.join(format!("temp_{}.{}", Uuid::new_v4(), kind.extension()));
        tokio::fs::write(&temp_path, &data).await?;

        let got = artifact_id(&data, id.len() == 8);
        if got != id {
            warn!("Artifact {} failed verification: content hashed to {}", id, got);
            tokio::fs::remove_file(&temp_path).await?;
            return Err(StorageError::Integrity {
                id: id.to_string(),
                got,
            });
        }

        // Last writer wins; concurrent fetches of the same id converge on
        // the same final path through the atomic rename.
        let final_path = dir.join(format!("{}.{}", id, kind.extension()));
        tokio::fs::rename(&temp_path, &final_path).await?;
        Ok(final_path)
    }
}
