//! Filesystem-backed object store. Buckets are directories under a root.

use async_trait::async_trait;
use mediaflow_core::{keys, Error, ObjectStore, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the objects of `bucket`.
    pub fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket.contains('/') || bucket.contains('\\') || bucket == "." || bucket == ".." {
            return Err(Error::InvalidInput(format!("invalid bucket name: {:?}", bucket)));
        }
        Ok(self.root.join(bucket))
    }

    /// Path of an object. Keys must be relative and free of `.`/`..` segments.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let invalid = || Error::InvalidInput(format!("invalid object key: {:?}", key));
        if key.is_empty() || key.starts_with('/') || key.contains('\\') {
            return Err(invalid());
        }

        let mut path = self.bucket_dir(bucket)?;
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(invalid());
            }
            path.push(segment);
        }
        Ok(path)
    }

    pub async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let path = self.object_path(bucket, key)?;
        Ok(fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false))
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn not_found_or_io(err: std::io::Error, bucket: &str, key: &str) -> Error {
    if err.kind() == ErrorKind::NotFound {
        Error::NotFound(keys::s3_uri(bucket, key))
    } else {
        Error::Storage(format!("{}: {}", keys::s3_uri(bucket, key), err))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).await.map_err(|e| not_found_or_io(e, bucket, key))
    }

    async fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        Self::ensure_parent(&path).await?;
        fs::write(&path, body)
            .await
            .map_err(|e| not_found_or_io(e, bucket, key))?;
        debug!("Wrote {} bytes to {:?}", body.len(), path);
        Ok(())
    }

    async fn copy(&self, bucket: &str, source_key: &str, dest_bucket: &str, dest_key: &str) -> Result<()> {
        let source = self.object_path(bucket, source_key)?;
        let dest = self.object_path(dest_bucket, dest_key)?;
        Self::ensure_parent(&dest).await?;
        fs::copy(&source, &dest)
            .await
            .map_err(|e| not_found_or_io(e, bucket, source_key))?;
        debug!("Copied {:?} to {:?}", source, dest);
        Ok(())
    }
}
