//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that round-trips a probe object through the bucket

use crate::{
    models::object::{PutBody, PutOptions},
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

const PROBE: &[u8] = b"readyz";

/// `GET /healthz`
///
/// Very small liveness probe: always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Writes, reads back, and deletes a probe object under `.readyz/` in the
/// configured bucket. HTTP 200 when the round trip succeeds, 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let bucket = state.admin.bucket();
    let key = format!(".readyz/{}", Uuid::new_v4());

    let bucket_check = match bucket
        .put(&key, PutBody::Bytes(Bytes::from_static(PROBE)), PutOptions::default())
        .await
    {
        Ok(_) => match bucket.get(&key).await {
            Ok(Some(object)) if object.bytes().as_ref() == PROBE => {
                match bucket.delete(&key).await {
                    Ok(()) => (true, None),
                    Err(e) => {
                        error!(
                            operation = "readyz_delete",
                            key = %key,
                            error = %e,
                            "could not remove readiness object"
                        );
                        (true, Some("bucket delete failed"))
                    }
                }
            }
            Ok(Some(_)) => {
                let _ = bucket.delete(&key).await; // best-effort cleanup
                (false, Some("bucket content mismatch"))
            }
            Ok(None) => (false, Some("bucket object vanished after write")),
            Err(e) => {
                error!(
                    operation = "readyz_get",
                    key = %key,
                    error = %e,
                    "could not read readiness object"
                );
                let _ = bucket.delete(&key).await; // best-effort cleanup
                (false, Some("bucket read failed"))
            }
        },
        Err(e) => {
            error!(
                operation = "readyz_put",
                key = %key,
                error = %e,
                "could not write readiness object"
            );
            (false, Some("bucket write failed"))
        }
    };

    let overall_ok = bucket_check.0;
    let mut checks = HashMap::new();
    checks.insert(
        "bucket",
        CheckStatus {
            ok: bucket_check.0,
            error: bucket_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        backend: state.admin.backend().to_string(),
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    backend: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<&'static str>,
}
