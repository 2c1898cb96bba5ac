//! Defines every HTTP route of the service.
//!
//! ## Structure
//! - **Health**
//!   - `GET  /healthz`, `GET /readyz`
//!
//! - **Public content**
//!   - `GET  /api/content/gallery`: gallery with public URLs
//!   - `GET  /api/content/downloads`: downloads with public URLs
//!   - `GET  /api/media/{*key}`: re-serve an object from the bucket
//!
//! - **Admin** (bearer token required)
//!   - `POST /api/admin/upload`: PDF document upload
//!   - `POST /api/admin/upload/image`: gallery image upload
//!   - `POST /api/admin/update`: replace a content document
//!   - `POST /api/admin/delete`: delete an object by key or URL
//!   - `GET  /api/admin/verify`: current user
//!   - `GET  /api/admin/export`: both content documents as stored

use crate::{
    handlers::{admin_handlers, content_handlers, health_handlers},
    services::admin_service::{MAX_CONTENT_UPDATE_BYTES, MAX_DOCUMENT_BYTES},
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Multipart framing headroom on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the router for all routes. The router carries `AppState` to handlers.
pub fn routes() -> Router<AppState> {
    let uploads = Router::new()
        .route("/api/admin/upload", post(admin_handlers::upload_document))
        .route("/api/admin/upload/image", post(admin_handlers::upload_image))
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + MULTIPART_OVERHEAD));

    Router::new()
        .route("/healthz", get(health_handlers::healthz))
        .route("/readyz", get(health_handlers::readyz))
        .route("/api/content/gallery", get(content_handlers::gallery))
        .route("/api/content/downloads", get(content_handlers::downloads))
        .route("/api/media/{*key}", get(content_handlers::media))
        .route(
            "/api/admin/update",
            post(admin_handlers::update_content)
                .layer(DefaultBodyLimit::max(MAX_CONTENT_UPDATE_BYTES * 4)),
        )
        .route("/api/admin/delete", post(admin_handlers::delete_object))
        .route("/api/admin/verify", get(admin_handlers::verify))
        .route("/api/admin/export", get(admin_handlers::export))
        .merge(uploads)
}

/// The full application: routes, request tracing, and state.
pub fn app(state: AppState) -> Router {
    routes().layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::AdminUser,
        services::{
            admin_service::AdminService,
            auth_service::{StaticTokenAuthenticator, TokenEntry},
            disk_bucket::DiskBucket,
            keys::PublicUrls,
        },
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-SCHOOL-SITE-BOUNDARY";

    async fn setup_test_app() -> (Router, TempDir) {
        let tmp = TempDir::new().expect("tempdir");
        let bucket = DiskBucket::new(tmp.path().join("bucket")).await.expect("bucket");
        let admin = AdminService::new(Arc::new(bucket), PublicUrls::new(None, false));
        let auth = StaticTokenAuthenticator::from_entries([
            TokenEntry {
                token: "admin-token".into(),
                user: AdminUser {
                    id: 1,
                    username: "principal".into(),
                    role: "admin".into(),
                    permissions: vec![],
                },
            },
            TokenEntry {
                token: "gallery-token".into(),
                user: AdminUser {
                    id: 2,
                    username: "photographer".into(),
                    role: "editor".into(),
                    permissions: vec!["gallery:write".into()],
                },
            },
        ]);
        (app(AppState::new(admin, Arc::new(auth))), tmp)
    }

    fn multipart_body(label: (&str, &str), file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                label.0, label.1
            )
            .as_bytes(),
        );
        if let Some((name, content_type, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(uri: &str, token: Option<&str>, body: Vec<u8>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body)).expect("request")
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = if body.is_null() {
            Body::empty()
        } else {
            Body::from(body.to_string())
        };
        builder.body(body).expect("request")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn healthz_and_readyz_report_ok() {
        let (router, _tmp) = setup_test_app().await;
        let response = router
            .clone()
            .oneshot(json_request("GET", "/healthz", None, Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(json_request("GET", "/readyz", None, Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["backend"], "disk");
        assert_eq!(body["checks"]["bucket"]["ok"], true);
    }

    #[tokio::test]
    async fn readyz_hides_backend_errors() {
        let (router, tmp) = setup_test_app().await;
        std::fs::write(tmp.path().join("bucket").join(".readyz"), b"not a directory").unwrap();

        let response = router
            .oneshot(json_request("GET", "/readyz", None, Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["checks"]["bucket"]["ok"], false);
        assert_eq!(body["checks"]["bucket"]["error"], "bucket write failed");
        let text = body.to_string();
        assert!(!text.contains("os error"), "{text}");
        assert!(!text.contains(".readyz"), "{text}");
    }

    #[tokio::test]
    async fn admin_routes_require_a_token() {
        let (router, _tmp) = setup_test_app().await;
        let response = router
            .clone()
            .oneshot(json_request("GET", "/api/admin/verify", None, Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);

        let response = router
            .oneshot(json_request(
                "GET",
                "/api/admin/verify",
                Some("admin-token"),
                Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["user"]["username"], "principal");
    }

    #[tokio::test]
    async fn pdf_upload_then_proxy_download() {
        let (router, _tmp) = setup_test_app().await;
        let body = multipart_body(
            ("category", "general"),
            Some(("Prospectus 2025.pdf", "application/pdf", b"%PDF-1.7 body")),
        );
        let response = router
            .clone()
            .oneshot(upload_request("/api/admin/upload", Some("admin-token"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let uploaded = body_json(response).await;
        assert_eq!(uploaded["success"], true);
        assert_eq!(uploaded["name"], "Prospectus 2025.pdf");
        let url = uploaded["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/api/media/docs/general/"));
        assert!(url.ends_with("-Prospectus2025.pdf"));

        let response = router
            .oneshot(json_request("GET", &url, None, Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"%PDF-1.7 body");
    }

    #[tokio::test]
    async fn upload_rejects_non_pdf_and_missing_file() {
        let (router, _tmp) = setup_test_app().await;
        let body = multipart_body(
            ("category", "general"),
            Some(("fake.pdf", "text/plain", b"hello")),
        );
        let response = router
            .clone()
            .oneshot(upload_request("/api/admin/upload", Some("admin-token"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = multipart_body(("category", "general"), None);
        let response = router
            .oneshot(upload_request("/api/admin/upload", Some("admin-token"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "No file provided");
    }

    #[tokio::test]
    async fn update_then_public_read_and_export() {
        let (router, _tmp) = setup_test_app().await;
        let update = json!({
            "type": "gallery_meta",
            "fullData": { "events": ["https://host/a.jpg"], "infrastructure": [] }
        });
        let response = router
            .clone()
            .oneshot(json_request("POST", "/api/admin/update", Some("gallery-token"), update))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "success": true }));

        let response = router
            .clone()
            .oneshot(json_request("GET", "/api/content/gallery", None, Value::Null))
            .await
            .unwrap();
        let gallery = body_json(response).await;
        assert_eq!(gallery["success"], true);
        assert_eq!(gallery["events"], json!(["/api/media/a.jpg"]));

        let response = router
            .clone()
            .oneshot(json_request("GET", "/api/admin/export", Some("admin-token"), Value::Null))
            .await
            .unwrap();
        let export = body_json(response).await;
        assert_eq!(export["gallery"]["events"], json!(["a.jpg"]));
        assert!(export["exportedAt"].is_string());

        let response = router
            .oneshot(json_request("GET", "/api/admin/export", Some("gallery-token"), Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn update_rejects_large_payloads_with_413() {
        let (router, _tmp) = setup_test_app().await;
        let padding = "x".repeat(MAX_CONTENT_UPDATE_BYTES);
        let update = json!({
            "type": "downloads_meta",
            "fullData": { "general": [{ "url": "docs/general/a.pdf", "note": padding }] }
        });
        let response = router
            .oneshot(json_request("POST", "/api/admin/update", Some("admin-token"), update))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn delete_validates_keys_and_permissions() {
        let (router, _tmp) = setup_test_app().await;
        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/admin/delete",
                Some("admin-token"),
                json!({ "key": "docs/../gallery.json" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/admin/delete",
                Some("gallery-token"),
                json!({ "url": "/api/media/docs/general/a.pdf" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = router
            .oneshot(json_request(
                "POST",
                "/api/admin/delete",
                Some("gallery-token"),
                json!({ "url": "http://localhost:3000/api/media/gallery/events/a.jpg" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["key"], "gallery/events/a.jpg");
    }

    #[tokio::test]
    async fn media_proxy_404s_and_rejects_traversal() {
        let (router, _tmp) = setup_test_app().await;
        let response = router
            .clone()
            .oneshot(json_request("GET", "/api/media/missing.pdf", None, Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(json_request("GET", "/api/media/docs/..%2F..%2Fsecret", None, Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
