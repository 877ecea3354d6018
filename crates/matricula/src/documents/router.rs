use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::enrollment::domain::RequestKind;
use crate::error::ApiError;

use super::domain::{Attachment, AttachmentFilter, AttachmentPayload, UploadedFile};
use super::service::{AttachmentService, UploadMeta};

#[derive(Debug, Default, Deserialize)]
struct DocumentFilterQuery {
    tipo_solicitud: Option<String>,
    solicitud_id: Option<i64>,
    tipo_documento: Option<String>,
}

pub fn document_router(service: Arc<AttachmentService>) -> Router {
    let body_limit = service.body_limit();
    Router::new()
        .route(
            "/api/documentos",
            get(list_documents).post(create_document),
        )
        .route(
            "/api/documentos/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route(
            "/api/solicitudes/:tipo/:id/documentos",
            get(documents_by_request),
        )
        .route(
            "/api/estudiantes/:id/documentos",
            get(documents_by_student),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

async fn list_documents(
    State(service): State<Arc<AttachmentService>>,
    Query(query): Query<DocumentFilterQuery>,
) -> Result<Json<Vec<Attachment>>, ApiError> {
    let tipo_solicitud = match query.tipo_solicitud.as_deref() {
        None => None,
        Some(raw) => Some(RequestKind::parse(raw).ok_or_else(|| {
            ApiError::Validation(format!(
                "invalid request type. Must be one of: {}",
                RequestKind::ALLOWED
            ))
        })?),
    };
    Ok(Json(service.list(AttachmentFilter {
        tipo_solicitud,
        solicitud_id: query.solicitud_id,
        tipo_documento: query.tipo_documento,
    })?))
}

async fn get_document(
    State(service): State<Arc<AttachmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<Attachment>, ApiError> {
    Ok(Json(service.get(id)?))
}

/// Multipart create: metadata fields plus one file under `documento`.
async fn create_document(
    State(service): State<Arc<AttachmentService>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut meta = UploadMeta::default();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::Validation(format!("malformed multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if field.file_name().is_some() {
            let original_name = field
                .file_name()
                .unwrap_or("archivo")
                .to_string();
            let mime = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|err| {
                if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    ApiError::PayloadTooLarge(service.size_limit_message())
                } else {
                    ApiError::Validation(format!("failed to read the uploaded file: {err}"))
                }
            })?;
            file = Some(UploadedFile {
                field_name: name,
                original_name,
                mime,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(|err| {
                ApiError::Validation(format!("malformed multipart field: {err}"))
            })?;
            match name.as_str() {
                "tipo_solicitud" => meta.tipo_solicitud = Some(value),
                "solicitud_id" => {
                    meta.solicitud_id = Some(value.parse::<i64>().map_err(|_| {
                        ApiError::Validation("solicitud_id must be an integer".to_string())
                    })?)
                }
                "tipo_documento" => meta.tipo_documento = Some(value),
                _ => {}
            }
        }
    }

    let file = file.ok_or_else(|| ApiError::Validation("no file was provided".to_string()))?;
    let (attachment, stored) = service.create_from_upload(meta, file)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": attachment.id,
            "message": "document created successfully",
            "file": {
                "originalname": stored.nombre_original,
                "filename": stored.nombre_almacenado,
                "path": stored.ruta,
                "size": stored.size,
                "mimetype": stored.mime,
            }
        })),
    ))
}

async fn update_document(
    State(service): State<Arc<AttachmentService>>,
    Path(id): Path<i64>,
    Json(payload): Json<AttachmentPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.update(id, payload)?;
    Ok(Json(json!({ "message": "document updated successfully" })))
}

async fn delete_document(
    State(service): State<Arc<AttachmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.delete(id)?;
    Ok(Json(json!({ "message": "document deleted successfully" })))
}

async fn documents_by_request(
    State(service): State<Arc<AttachmentService>>,
    Path((tipo, id)): Path<(String, i64)>,
) -> Result<Json<Vec<Attachment>>, ApiError> {
    Ok(Json(service.by_request(&tipo, id)?))
}

async fn documents_by_student(
    State(service): State<Arc<AttachmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Attachment>>, ApiError> {
    Ok(Json(service.by_student(id)?))
}
