//! Disk-backed bucket used in development.
//!
//! Objects live at `root/{key}` with `/` in the key mapped to nested
//! directories. Metadata in [`PutOptions`] has nowhere to live on disk and is
//! dropped. Writes are plain full-file overwrites: two concurrent puts to the
//! same key may interleave. Keys are not sanitized here; callers validate
//! them before they reach this type.

use crate::{
    models::object::{PutBody, PutOptions, PutReceipt, StoredObject},
    services::storage_service::{BackendKind, Bucket, BucketError, BucketResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct DiskBucket {
    root: PathBuf,
}

impl DiskBucket {
    /// Open a bucket rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> BucketResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Path an object key maps to. Pure; touches nothing on disk.
    pub fn file_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(key.split('/').filter(|segment| !segment.is_empty()));
        path
    }

    /// Side effect: creates every missing parent directory of `path`.
    async fn ensure_parent_dir(&self, path: &Path) -> BucketResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Bucket for DiskBucket {
    async fn get(&self, key: &str) -> BucketResult<Option<StoredObject>> {
        let path = self.file_path(key);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(StoredObject::new(key, Bytes::from(data)))),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(key, "object not found on disk");
                Ok(None)
            }
            Err(err) => Err(BucketError::Io(err)),
        }
    }

    async fn put(&self, key: &str, body: PutBody, _options: PutOptions) -> BucketResult<PutReceipt> {
        let data = body.into_bytes().map_err(|source| BucketError::Json {
            key: key.to_string(),
            source,
        })?;
        let path = self.file_path(key);
        self.ensure_parent_dir(&path).await?;
        fs::write(&path, &data).await?;

        debug!(key, path = %path.display(), size_bytes = data.len(), "wrote object to disk");

        Ok(PutReceipt {
            key: key.to_string(),
            size_bytes: data.len() as u64,
            etag: None,
        })
    }

    async fn delete(&self, key: &str) -> BucketResult<()> {
        let path = self.file_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "removed object from disk");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BucketError::Io(err)),
        }
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Disk
    }
}
