use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;

pub const PRODUCTS_BUCKET: &str = "Products";
pub const BANNERS_BUCKET: &str = "banners";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object name {0:?}")]
    InvalidName(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bucket: &str, name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    fn public_url(&self, bucket: &str, name: &str) -> String;

    /// Object names in the bucket, sorted. A missing bucket is empty.
    async fn list(&self, bucket: &str) -> Result<Vec<String>, StorageError>;
}

/// Buckets as directories under `root`, served from `public_base_url`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, name: &str) -> Result<PathBuf, StorageError> {
        check_segment(bucket)?;
        check_segment(name)?;
        Ok(self.root.join(bucket).join(name))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, bucket: &str, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.object_path(bucket, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        tracing::debug!(bucket, name, size = bytes.len(), "object uploaded");
        Ok(())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, name)
    }

    async fn list(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        check_segment(bucket)?;
        let dir = self.root.join(bucket);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn check_segment(segment: &str) -> Result<(), StorageError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
    {
        return Err(StorageError::InvalidName(segment.to_string()));
    }
    Ok(())
}
