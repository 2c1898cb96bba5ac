//! Public read routes: content documents with resolved URLs, and the media
//! proxy that re-serves bucket objects.

use crate::{errors::AppError, models::object::StoredObject, state::AppState};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Default Cache-Control for proxied objects without their own.
const PROXY_CACHE_CONTROL: &str = "public, max-age=300";

#[derive(Serialize)]
struct Listing<T> {
    success: bool,
    #[serde(flatten)]
    document: T,
}

/// `GET /api/content/gallery`
pub async fn gallery(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let document = state.admin.public_gallery().await?;
    Ok(Json(Listing {
        success: true,
        document,
    }))
}

/// `GET /api/content/downloads`
pub async fn downloads(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let document = state.admin.public_downloads().await?;
    Ok(Json(Listing {
        success: true,
        document,
    }))
}

/// `GET /api/media/{*key}`: stream an object out of the bucket.
pub async fn media(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let object = state.admin.media(&key).await?;
    let mut headers = HeaderMap::new();
    set_object_headers(&mut headers, &object);

    let mut response = Response::new(Body::from(object.body));
    *response.status_mut() = StatusCode::OK;
    *response.headers_mut() = headers;
    Ok(response)
}

fn set_object_headers(headers: &mut HeaderMap, object: &StoredObject) {
    let content_type = object
        .content_type
        .clone()
        .unwrap_or_else(|| guess_content_type(&object.key).to_string());
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    let cache_control = object
        .cache_control
        .as_deref()
        .unwrap_or(PROXY_CACHE_CONTROL);
    if let Ok(value) = HeaderValue::from_str(cache_control) {
        headers.insert(header::CACHE_CONTROL, value);
    }

    if let Some(value) = object
        .content_disposition
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(object.body.len()));
}

fn guess_content_type(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "json" => "application/json",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
