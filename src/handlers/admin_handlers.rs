//! HTTP handlers for the admin-only routes.
//!
//! Each handler authenticates first, then decodes the request and hands it to
//! `AdminService`. Extractor rejections are taken as `Result`s so that every
//! failure renders the same `{success, message}` body.

use crate::{
    errors::AppError,
    models::user::AdminUser,
    services::admin_service::{DeleteRequest, UploadForm, UploadedFile},
    state::AppState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{BytesRejection, JsonRejection},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use tracing::debug;

/// Resolve the caller through the authentication collaborator.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AdminUser, AppError> {
    let outcome = state.auth.authenticate(headers).await;
    if let (true, Some(user)) = (outcome.authenticated, outcome.user) {
        return Ok(user);
    }
    debug!(code = ?outcome.error_code, "authentication failed");
    Err(AppError::unauthorized(
        outcome
            .error
            .unwrap_or_else(|| "Authentication required".to_string()),
    ))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::bad_request("File exceeds the upload limit")
    } else {
        AppError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// Collect the `file` field and the field named `label_field` from a form.
async fn read_upload_form(
    multipart: Result<Multipart, MultipartRejection>,
    label_field: &str,
) -> Result<UploadForm, AppError> {
    let mut multipart = multipart.map_err(|r| AppError::bad_request(r.body_text()))?;
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            Some(name) if name == label_field => {
                let value = field.text().await.map_err(multipart_error)?;
                form.label = Some(value.trim().to_string());
            }
            _ => {}
        }
    }

    Ok(form)
}

/// `POST /api/admin/upload`: multipart `file` (PDF) + `category`.
pub async fn upload_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state, &headers).await?;
    let form = read_upload_form(multipart, "category").await?;
    let response = state.admin.upload_document(&user, form).await?;
    Ok(Json(response))
}

/// `POST /api/admin/upload/image`: multipart `file` (image) + `section`.
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state, &headers).await?;
    let form = read_upload_form(multipart, "section").await?;
    let response = state.admin.upload_image(&user, form).await?;
    Ok(Json(response))
}

/// `POST /api/admin/update`: `{"type": "gallery_meta" | "downloads_meta", "fullData": {...}}`.
pub async fn update_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state, &headers).await?;
    let body = body.map_err(|r| AppError::new(r.status(), r.body_text()))?;
    state.admin.update_content(&user, &body).await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/admin/delete`: `{"key": ...}` or `{"url": ...}`.
pub async fn delete_object(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state, &headers).await?;
    let Json(request) = payload.map_err(|r| AppError::bad_request(r.body_text()))?;
    let response = state.admin.delete_object(&user, request).await?;
    Ok(Json(response))
}

/// `GET /api/admin/verify`: who am I.
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state, &headers).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

/// `GET /api/admin/export`: both content documents as stored.
pub async fn export(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state, &headers).await?;
    Ok(Json(state.admin.export(&user).await?))
}
