//! Schema types for the two content documents, `gallery.json` and
//! `downloads.json`, and the tagged update request that replaces them.
//!
//! Documents are decoded into these types at the boundary; anything that does
//! not fit is rejected before it reaches storage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const GALLERY_KEY: &str = "gallery.json";
pub const DOWNLOADS_KEY: &str = "downloads.json";

/// Per-section cap on gallery entries.
pub const MAX_GALLERY_ENTRIES: usize = 10;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("`{field}` may hold at most {max} entries (got {actual})")]
    TooManyEntries {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    #[error("malformed content document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// `gallery.json`: storage keys of the images shown per gallery section.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct GalleryDocument {
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub infrastructure: Vec<String>,
}

impl GalleryDocument {
    pub fn validate(&self) -> Result<(), ContentError> {
        for (field, entries) in [
            ("events", &self.events),
            ("infrastructure", &self.infrastructure),
        ] {
            if entries.len() > MAX_GALLERY_ENTRIES {
                return Err(ContentError::TooManyEntries {
                    field,
                    max: MAX_GALLERY_ENTRIES,
                    actual: entries.len(),
                });
            }
        }
        Ok(())
    }

    /// Rewrite every entry through `f`.
    pub fn map_urls(self, f: impl Fn(&str) -> String) -> Self {
        Self {
            events: self.events.iter().map(|u| f(u.as_str())).collect(),
            infrastructure: self.infrastructure.iter().map(|u| f(u.as_str())).collect(),
        }
    }
}

/// One downloadable document. Fields other than `url` and `title` are kept
/// verbatim so the editor can attach whatever it needs (dates, sizes, labels).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DownloadEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `downloads.json`: exam results and general documents.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DownloadsDocument {
    #[serde(default)]
    pub results: Vec<DownloadEntry>,
    #[serde(default)]
    pub general: Vec<DownloadEntry>,
}

impl DownloadsDocument {
    pub fn map_urls(self, f: impl Fn(&str) -> String) -> Self {
        let rewrite = |entries: Vec<DownloadEntry>| -> Vec<DownloadEntry> {
            entries
                .into_iter()
                .map(|entry| DownloadEntry {
                    url: f(&entry.url),
                    ..entry
                })
                .collect()
        };
        Self {
            results: rewrite(self.results),
            general: rewrite(self.general),
        }
    }
}

/// Body of the content update route: `{"type": ..., "fullData": {...}}`.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "fullData", rename_all = "snake_case")]
pub enum ContentUpdate {
    GalleryMeta(GalleryDocument),
    DownloadsMeta(DownloadsDocument),
}

impl ContentUpdate {
    pub fn decode(body: &[u8]) -> Result<Self, ContentError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Fixed key the document is written to.
    pub fn document_key(&self) -> &'static str {
        match self {
            ContentUpdate::GalleryMeta(_) => GALLERY_KEY,
            ContentUpdate::DownloadsMeta(_) => DOWNLOADS_KEY,
        }
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        match self {
            ContentUpdate::GalleryMeta(doc) => doc.validate(),
            ContentUpdate::DownloadsMeta(_) => Ok(()),
        }
    }
}
