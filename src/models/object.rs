//! Represents an object (payload plus advisory metadata) stored in a bucket.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// A single object read back from a bucket.
///
/// The payload is held once as raw bytes; [`StoredObject::json`] parses it on
/// demand, so callers that only stream the bytes never pay for (or fail on)
/// JSON decoding.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Key the object was read from.
    pub key: String,

    /// Full object content.
    pub body: Bytes,

    /// Content type, when the backend records one.
    pub content_type: Option<String>,

    /// Cache-Control directive, when the backend records one.
    pub cache_control: Option<String>,

    /// Content-Disposition header, when the backend records one.
    pub content_disposition: Option<String>,
}

impl StoredObject {
    /// An object with no metadata.
    pub fn new(key: impl Into<String>, body: Bytes) -> Self {
        Self {
            key: key.into(),
            body,
            content_type: None,
            cache_control: None,
            content_disposition: None,
        }
    }

    /// Raw byte view.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Parsed JSON view. Fails if the stored content is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Value handed to `Bucket::put`.
#[derive(Debug, Clone)]
pub enum PutBody {
    /// Written unchanged.
    Bytes(Bytes),
    /// Serialized as pretty-printed JSON, fields in the order they were built.
    Json(Value),
}

impl PutBody {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(PutBody::Json(serde_json::to_value(value)?))
    }

    /// Bytes that end up in storage.
    pub fn into_bytes(self) -> Result<Bytes, serde_json::Error> {
        match self {
            PutBody::Bytes(bytes) => Ok(bytes),
            PutBody::Json(value) => Ok(Bytes::from(serde_json::to_vec_pretty(&value)?)),
        }
    }
}

impl From<Bytes> for PutBody {
    fn from(bytes: Bytes) -> Self {
        PutBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for PutBody {
    fn from(bytes: Vec<u8>) -> Self {
        PutBody::Bytes(Bytes::from(bytes))
    }
}

/// Advisory metadata for a put. Backends that cannot represent a field drop it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
}

impl PutOptions {
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    pub fn content_disposition(mut self, value: impl Into<String>) -> Self {
        self.content_disposition = Some(value.into());
        self
    }
}

/// Acknowledgement of a completed put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutReceipt {
    pub key: String,
    pub size_bytes: u64,
    pub etag: Option<String>,
}
