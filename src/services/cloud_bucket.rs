//! Production bucket backed by an S3-compatible object store.

use crate::{
    models::object::{PutBody, PutOptions, PutReceipt, StoredObject},
    services::storage_service::{BackendKind, Bucket, BucketError, BucketResult, CloudBinding},
};
use async_trait::async_trait;
use object_store::{
    Attribute, Attributes, Error as ObjectStoreError, ObjectStoreExt, PutPayload,
    aws::AmazonS3Builder, path::Path,
};
use std::{sync::Arc, time::Instant};

#[derive(Clone)]
pub struct CloudBucket {
    store: Arc<dyn object_store::ObjectStore>,
    name: String,
}

impl CloudBucket {
    pub fn new(store: Arc<dyn object_store::ObjectStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    /// Connect to the configured bucket. Credentials come from the usual
    /// `AWS_*` environment variables.
    pub fn s3(binding: &CloudBinding) -> BucketResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(binding.bucket.clone())
            .with_region(binding.region.clone());

        if let Some(endpoint) = &binding.endpoint {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| BucketError::Config(e.to_string()))?;
        Ok(Self::new(Arc::new(store), binding.bucket.clone()))
    }
}

fn attributes_from(options: &PutOptions) -> Attributes {
    let mut attributes = Attributes::new();
    let pairs = [
        (Attribute::ContentType, &options.content_type),
        (Attribute::CacheControl, &options.cache_control),
        (Attribute::ContentDisposition, &options.content_disposition),
    ];
    for (attribute, value) in pairs {
        if let Some(value) = value {
            attributes.insert(attribute, value.clone().into());
        }
    }
    attributes
}

#[async_trait]
impl Bucket for CloudBucket {
    async fn get(&self, key: &str) -> BucketResult<Option<StoredObject>> {
        let location = Path::from(key);
        let result = match self.store.get(&location).await {
            Ok(result) => result,
            Err(ObjectStoreError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let attribute = |name: Attribute| result.attributes.get(&name).map(|v| v.to_string());
        let content_type = attribute(Attribute::ContentType);
        let cache_control = attribute(Attribute::CacheControl);
        let content_disposition = attribute(Attribute::ContentDisposition);
        let body = result.bytes().await?;

        Ok(Some(StoredObject {
            key: key.to_string(),
            body,
            content_type,
            cache_control,
            content_disposition,
        }))
    }

    async fn put(&self, key: &str, body: PutBody, options: PutOptions) -> BucketResult<PutReceipt> {
        let start = Instant::now();
        let data = body.into_bytes().map_err(|source| BucketError::Json {
            key: key.to_string(),
            source,
        })?;
        let size_bytes = data.len() as u64;
        let opts = object_store::PutOptions {
            attributes: attributes_from(&options),
            ..Default::default()
        };

        let result = object_store::ObjectStore::put_opts(
            &*self.store,
            &Path::from(key),
            PutPayload::from(data),
            opts,
        )
        .await?;

        tracing::debug!(
            bucket = %self.name,
            key,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "cloud put complete"
        );

        Ok(PutReceipt {
            key: key.to_string(),
            size_bytes,
            etag: result.e_tag,
        })
    }

    async fn delete(&self, key: &str) -> BucketResult<()> {
        match self.store.delete(&Path::from(key)).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Cloud
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use serde_json::json;

    fn bucket() -> CloudBucket {
        CloudBucket::new(Arc::new(InMemory::new()), "test")
    }

    #[tokio::test]
    async fn round_trips_bytes_and_metadata() {
        let bucket = bucket();
        let options = PutOptions::default()
            .content_type("application/pdf")
            .cache_control("public, max-age=31536000, immutable")
            .content_disposition("attachment; filename=\"Report.pdf\"");

        bucket
            .put("docs/general/1-abc-Report.pdf", Bytes::from_static(b"%PDF").into(), options)
            .await
            .unwrap();

        let object = bucket.get("docs/general/1-abc-Report.pdf").await.unwrap().unwrap();
        assert_eq!(object.bytes().as_ref(), b"%PDF");
        assert_eq!(object.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(
            object.content_disposition.as_deref(),
            Some("attachment; filename=\"Report.pdf\"")
        );
    }

    #[tokio::test]
    async fn missing_key_is_absent() {
        assert!(bucket().get("missing.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_put_overwrites_and_delete_removes() {
        let bucket = bucket();
        bucket
            .put("gallery.json", PutBody::Json(json!({ "events": ["a.jpg"] })), PutOptions::default())
            .await
            .unwrap();
        bucket
            .put("gallery.json", PutBody::Json(json!({ "events": [] })), PutOptions::default())
            .await
            .unwrap();
        let value: serde_json::Value = bucket.get("gallery.json").await.unwrap().unwrap().json().unwrap();
        assert_eq!(value, json!({ "events": [] }));

        bucket.delete("gallery.json").await.unwrap();
        assert!(bucket.get("gallery.json").await.unwrap().is_none());
        bucket.delete("gallery.json").await.unwrap();
    }
}
