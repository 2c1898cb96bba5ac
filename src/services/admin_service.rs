//! Admin mutations (upload, content update, delete, export) and the public
//! read views of the content documents.
//!
//! Nothing here knows about HTTP extraction; handlers decode requests into the
//! input types below and render the returned values. Every validation runs
//! before the first storage call so a rejected request never writes anything.

use crate::{
    errors::AppError,
    models::{
        content::{ContentUpdate, DOWNLOADS_KEY, DownloadsDocument, GALLERY_KEY, GalleryDocument},
        object::{PutBody, PutOptions, StoredObject},
        user::AdminUser,
    },
    services::{
        keys::{self, PublicUrls},
        storage_service::{BackendKind, Bucket, load_document},
    },
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_CONTENT_UPDATE_BYTES: usize = 200 * 1024;
pub const MAX_RESULT_DOCUMENTS: usize = 3;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
pub const NO_CACHE: &str = "no-cache";

pub const CONTENT_WRITE: &str = "content:write";
pub const CONTENT_READ: &str = "content:read";
pub const GALLERY_WRITE: &str = "gallery:write";

const DOCUMENT_CATEGORIES: [&str; 2] = ["results", "general"];
const GALLERY_SECTIONS: [&str; 2] = ["events", "infrastructure"];
const IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// A file lifted out of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Form fields of an upload. `label` is the document category or gallery section.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub key: String,
    pub url: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    pub key: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub success: bool,
    pub exported_at: DateTime<Utc>,
    pub gallery: GalleryDocument,
    pub downloads: DownloadsDocument,
}

#[derive(Clone)]
pub struct AdminService {
    bucket: Arc<dyn Bucket>,
    urls: PublicUrls,
}

fn require(user: &AdminUser, permission: &str) -> Result<(), AppError> {
    if user.has_permission(permission) {
        Ok(())
    } else {
        debug!(user = %user.username, permission, "permission denied");
        Err(AppError::forbidden(format!("Missing permission `{}`", permission)))
    }
}

/// RFC 5987 `attr-char`: everything else in `filename*` is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// `Content-Disposition` value for an uploaded file.
///
/// The quoted `filename` is always a valid header token; names it cannot carry
/// verbatim also get a UTF-8 `filename*` parameter.
pub fn content_disposition(kind: &str, file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    if fallback == file_name {
        format!("{}; filename=\"{}\"", kind, fallback)
    } else {
        format!(
            "{}; filename=\"{}\"; filename*=UTF-8''{}",
            kind,
            fallback,
            utf8_percent_encode(file_name, ATTR_CHAR)
        )
    }
}

impl AdminService {
    pub fn new(bucket: Arc<dyn Bucket>, urls: PublicUrls) -> Self {
        Self { bucket, urls }
    }

    pub fn bucket(&self) -> &Arc<dyn Bucket> {
        &self.bucket
    }

    pub fn backend(&self) -> BackendKind {
        self.bucket.backend()
    }

    /// Upload a PDF under `docs/{category}/`.
    pub async fn upload_document(
        &self,
        user: &AdminUser,
        form: UploadForm,
    ) -> Result<UploadResponse, AppError> {
        require(user, CONTENT_WRITE)?;

        let file = form
            .file
            .ok_or_else(|| AppError::bad_request("No file provided"))?;
        if file.content_type != PDF_CONTENT_TYPE {
            return Err(AppError::bad_request("Only PDF files are allowed"));
        }
        if file.data.len() > MAX_DOCUMENT_BYTES {
            return Err(AppError::bad_request("File exceeds the 20 MiB limit"));
        }
        let category = form.label.unwrap_or_else(|| "general".to_string());
        if !DOCUMENT_CATEGORIES.contains(&category.as_str()) {
            return Err(AppError::bad_request(format!(
                "Unknown document category `{}`",
                category
            )));
        }

        if category == "results" {
            let downloads: DownloadsDocument =
                load_document(self.bucket.as_ref(), DOWNLOADS_KEY)
                    .await
                    .map_err(|e| {
                        AppError::storage("read", DOWNLOADS_KEY, Some(user.username.as_str()), e)
                    })?;
            if downloads.results.len() >= MAX_RESULT_DOCUMENTS {
                return Err(AppError::forbidden(format!(
                    "At most {} result documents may be published; remove one first",
                    MAX_RESULT_DOCUMENTS
                )));
            }
        }

        let key = keys::upload_key(
            "docs",
            &category,
            Utc::now().timestamp_millis(),
            &keys::random_suffix(),
            &file.file_name,
            "pdf",
        );
        let options = PutOptions::default()
            .content_type(PDF_CONTENT_TYPE)
            .cache_control(IMMUTABLE_CACHE_CONTROL)
            .content_disposition(content_disposition("attachment", &file.file_name));

        self.store_upload(user, key, file, options).await
    }

    /// Upload a gallery image under `gallery/{section}/`.
    pub async fn upload_image(
        &self,
        user: &AdminUser,
        form: UploadForm,
    ) -> Result<UploadResponse, AppError> {
        require(user, GALLERY_WRITE)?;

        let file = form
            .file
            .ok_or_else(|| AppError::bad_request("No file provided"))?;
        let extension = IMAGE_TYPES
            .iter()
            .find(|(mime, _)| *mime == file.content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| AppError::bad_request("Only JPEG, PNG, WebP or GIF images are allowed"))?;
        if file.data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::bad_request("Image exceeds the 10 MiB limit"));
        }
        let section = form.label.unwrap_or_default();
        if !GALLERY_SECTIONS.contains(&section.as_str()) {
            return Err(AppError::bad_request(format!(
                "Unknown gallery section `{}`",
                section
            )));
        }

        let key = keys::upload_key(
            "gallery",
            &section,
            Utc::now().timestamp_millis(),
            &keys::random_suffix(),
            &file.file_name,
            extension,
        );
        let options = PutOptions::default()
            .content_type(file.content_type.clone())
            .cache_control(IMMUTABLE_CACHE_CONTROL)
            .content_disposition(content_disposition("inline", &file.file_name));

        self.store_upload(user, key, file, options).await
    }

    async fn store_upload(
        &self,
        user: &AdminUser,
        key: String,
        file: UploadedFile,
        options: PutOptions,
    ) -> Result<UploadResponse, AppError> {
        let receipt = self
            .bucket
            .put(&key, PutBody::Bytes(file.data), options)
            .await
            .map_err(|e| AppError::storage("put", &key, Some(user.username.as_str()), e))?;

        info!(
            user = %user.username,
            key = %receipt.key,
            size_bytes = receipt.size_bytes,
            etag = ?receipt.etag,
            "file uploaded"
        );

        Ok(UploadResponse {
            success: true,
            url: self.urls.url_for(&key),
            key,
            name: file.file_name,
        })
    }

    /// Replace `gallery.json` or `downloads.json` wholesale.
    pub async fn update_content(&self, user: &AdminUser, body: &[u8]) -> Result<(), AppError> {
        if body.len() > MAX_CONTENT_UPDATE_BYTES {
            return Err(AppError::payload_too_large("Content payload exceeds 200 KiB"));
        }
        let update = ContentUpdate::decode(body)?;
        let permission = match &update {
            ContentUpdate::GalleryMeta(_) => GALLERY_WRITE,
            ContentUpdate::DownloadsMeta(_) => CONTENT_WRITE,
        };
        require(user, permission)?;
        update.validate()?;

        let key = update.document_key();
        let cleanse = |url: &str| self.urls.cleanse(url);
        let document = match update {
            ContentUpdate::GalleryMeta(doc) => PutBody::json(&doc.map_urls(cleanse)),
            ContentUpdate::DownloadsMeta(doc) => PutBody::json(&doc.map_urls(cleanse)),
        }
        .map_err(|e| AppError::internal(format!("Could not encode document: {}", e)))?;

        self.bucket
            .put(
                key,
                document,
                PutOptions::default()
                    .content_type("application/json")
                    .cache_control(NO_CACHE),
            )
            .await
            .map_err(|e| AppError::storage("put", key, Some(user.username.as_str()), e))?;

        info!(user = %user.username, key, "content document replaced");
        Ok(())
    }

    /// Delete one object named by key or by URL.
    pub async fn delete_object(
        &self,
        user: &AdminUser,
        request: DeleteRequest,
    ) -> Result<DeleteResponse, AppError> {
        let raw = request
            .key
            .or(request.url)
            .ok_or_else(|| AppError::bad_request("Provide a key or url to delete"))?;
        let key = self.urls.cleanse(&raw);
        keys::validate_key(&key).map_err(AppError::bad_request)?;

        let permission = if key.starts_with("gallery/") {
            GALLERY_WRITE
        } else {
            CONTENT_WRITE
        };
        require(user, permission)?;

        self.bucket
            .delete(&key)
            .await
            .map_err(|e| AppError::storage("delete", &key, Some(user.username.as_str()), e))?;

        info!(user = %user.username, key = %key, "object deleted");
        Ok(DeleteResponse { success: true, key })
    }

    /// Both content documents exactly as stored.
    pub async fn export(&self, user: &AdminUser) -> Result<ExportResponse, AppError> {
        require(user, CONTENT_READ)?;
        let gallery = self.gallery(Some(user.username.as_str())).await?;
        let downloads = self.downloads(Some(user.username.as_str())).await?;
        Ok(ExportResponse {
            success: true,
            exported_at: Utc::now(),
            gallery,
            downloads,
        })
    }

    pub async fn gallery(&self, user: Option<&str>) -> Result<GalleryDocument, AppError> {
        load_document(self.bucket.as_ref(), GALLERY_KEY)
            .await
            .map_err(|e| AppError::storage("read", GALLERY_KEY, user, e))
    }

    pub async fn downloads(&self, user: Option<&str>) -> Result<DownloadsDocument, AppError> {
        load_document(self.bucket.as_ref(), DOWNLOADS_KEY)
            .await
            .map_err(|e| AppError::storage("read", DOWNLOADS_KEY, user, e))
    }

    /// `gallery.json` with every key turned into a public URL.
    pub async fn public_gallery(&self) -> Result<GalleryDocument, AppError> {
        Ok(self.gallery(None).await?.map_urls(|key| self.urls.url_for(key)))
    }

    /// `downloads.json` with every key turned into a public URL.
    pub async fn public_downloads(&self) -> Result<DownloadsDocument, AppError> {
        Ok(self
            .downloads(None)
            .await?
            .map_urls(|key| self.urls.url_for(key)))
    }

    /// Object behind the media proxy.
    pub async fn media(&self, key: &str) -> Result<StoredObject, AppError> {
        keys::validate_key(key).map_err(AppError::bad_request)?;
        self.bucket
            .get(key)
            .await
            .map_err(|e| AppError::storage("get", key, None, e))?
            .ok_or_else(|| AppError::not_found(format!("Object `{}` not found", key)))
    }
}
