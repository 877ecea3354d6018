use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;

use crate::infra::AppState;

pub(crate) fn ops_router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Static serving of stored uploads.
pub(crate) fn uploads_router(dir: PathBuf) -> Router {
    Router::new()
        .route("/uploads/:archivo", get(serve_upload))
        .with_state(Arc::new(dir))
}

async fn serve_upload(
    State(dir): State<Arc<PathBuf>>,
    Path(archivo): Path<String>,
) -> impl IntoResponse {
    // Stored names are flat; anything path-like is not ours.
    if archivo.contains('/') || archivo.contains('\\') || archivo.contains("..") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "invalid file name" })),
        )
            .into_response();
    }

    let path = dir.join(&archivo);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.to_string())],
                bytes,
            )
                .into_response()
        }
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "file not found" })),
        )
            .into_response(),
    }
}
