//! src/services/storage_service.rs
//!
//! The bucket abstraction every admin route writes through, and the provider
//! that picks a backend. Two backends exist: the production object store
//! (`CloudBucket`) and a local directory tree (`DiskBucket`) used in
//! development or whenever no production binding is configured.

use crate::{
    config::Environment,
    models::object::{PutBody, PutOptions, PutReceipt, StoredObject},
    services::{cloud_bucket::CloudBucket, disk_bucket::DiskBucket},
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::{fmt, io, path::PathBuf, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BucketError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Backend(#[from] object_store::Error),
    #[error("stored document `{key}` is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("bucket configuration: {0}")]
    Config(String),
}

pub type BucketResult<T> = Result<T, BucketError>;

/// Which backend a [`Bucket`] talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Cloud,
    Disk,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Cloud => write!(f, "cloud"),
            BackendKind::Disk => write!(f, "disk"),
        }
    }
}

/// Key-value object storage.
///
/// Keys are slash-delimited opaque strings. A put always replaces the whole
/// object; there is no versioning and no merge.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Read an object. A missing key is `Ok(None)`, never an error.
    async fn get(&self, key: &str) -> BucketResult<Option<StoredObject>>;

    /// Write or overwrite the object at `key`.
    async fn put(&self, key: &str, body: PutBody, options: PutOptions) -> BucketResult<PutReceipt>;

    /// Remove the object at `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> BucketResult<()>;

    fn backend(&self) -> BackendKind;
}

/// Read and decode a JSON document, treating a missing key as `T::default()`.
pub async fn load_document<T>(bucket: &dyn Bucket, key: &str) -> BucketResult<T>
where
    T: DeserializeOwned + Default,
{
    match bucket.get(key).await? {
        Some(object) => object.json().map_err(|source| BucketError::Json {
            key: key.to_string(),
            source,
        }),
        None => Ok(T::default()),
    }
}

/// Connection details of the production bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudBinding {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
}

/// Everything the provider needs, passed in explicitly at startup.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub environment: Environment,
    pub cloud: Option<CloudBinding>,
    pub disk_root: PathBuf,
}

/// The production binding wins only when one is configured and the process is
/// not running in development.
pub fn select_backend(config: &StorageConfig) -> BackendKind {
    match (&config.cloud, config.environment) {
        (Some(_), env) if !env.is_development() => BackendKind::Cloud,
        _ => BackendKind::Disk,
    }
}

/// Build the bucket chosen by [`select_backend`].
pub async fn open_bucket(config: &StorageConfig) -> BucketResult<Arc<dyn Bucket>> {
    let backend = select_backend(config);
    tracing::info!(%backend, environment = %config.environment, "opening bucket");

    match (backend, &config.cloud) {
        (BackendKind::Cloud, Some(binding)) => Ok(Arc::new(CloudBucket::s3(binding)?)),
        (BackendKind::Cloud, None) => Err(BucketError::Config(
            "cloud backend selected without a bucket binding".into(),
        )),
        (BackendKind::Disk, _) => Ok(Arc::new(DiskBucket::new(&config.disk_root).await?)),
    }
}
