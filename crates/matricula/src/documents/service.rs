use std::sync::Arc;

use tracing::warn;

use crate::enrollment::domain::{RequestKind, RequestRef};
use crate::error::ApiError;

use super::domain::{
    Attachment, AttachmentChanges, AttachmentDraft, AttachmentFilter, AttachmentPayload,
    StoredFile, UploadedFile, ALLOWED_MIME_TYPES, UPLOAD_FIELD,
};
use super::repository::{AttachmentStore, FileStore};

const ENTITY: &str = "document";

/// Upload metadata accompanying the file in the multipart body.
#[derive(Debug, Default)]
pub struct UploadMeta {
    pub tipo_solicitud: Option<String>,
    pub solicitud_id: Option<i64>,
    pub tipo_documento: Option<String>,
}

fn parse_kind(raw: &str) -> Result<RequestKind, ApiError> {
    RequestKind::parse(raw).ok_or_else(|| {
        ApiError::Validation(format!(
            "invalid request type. Must be one of: {}",
            RequestKind::ALLOWED
        ))
    })
}

pub struct AttachmentService {
    store: Arc<dyn AttachmentStore>,
    files: Arc<dyn FileStore>,
    max_bytes: usize,
}

impl AttachmentService {
    pub fn new(store: Arc<dyn AttachmentStore>, files: Arc<dyn FileStore>, max_bytes: usize) -> Self {
        Self {
            store,
            files,
            max_bytes,
        }
    }

    /// Ceiling for the whole multipart body; generous headroom over the
    /// per-file limit so the size check below owns the 413 message for
    /// merely-oversized files, not the transport layer.
    pub fn body_limit(&self) -> usize {
        self.max_bytes * 2 + 1024 * 1024
    }

    pub fn size_limit_message(&self) -> String {
        format!(
            "the file is too large. The maximum allowed size is {}MB",
            self.max_bytes / (1024 * 1024)
        )
    }

    /// Two-phase create: persist the file, then the row. The phases are
    /// not atomic; a failed insert triggers a best-effort delete of the
    /// stored file before the original error propagates.
    pub fn create_from_upload(
        &self,
        meta: UploadMeta,
        file: UploadedFile,
    ) -> Result<(Attachment, StoredFile), ApiError> {
        if file.field_name != UPLOAD_FIELD {
            return Err(ApiError::Validation(format!(
                "unexpected file field '{}'. Use '{UPLOAD_FIELD}' as the field name",
                file.field_name
            )));
        }
        if !ALLOWED_MIME_TYPES.contains(&file.mime.as_str()) {
            return Err(ApiError::Validation(
                "file type not allowed. Only PDFs, Word documents and images (JPEG, PNG, GIF, WEBP) are accepted"
                    .to_string(),
            ));
        }
        if file.bytes.len() > self.max_bytes {
            return Err(ApiError::PayloadTooLarge(self.size_limit_message()));
        }

        let (tipo_solicitud, solicitud_id, tipo_documento) =
            match (meta.tipo_solicitud, meta.solicitud_id, meta.tipo_documento) {
                (Some(t), Some(i), Some(d)) => (t, i, d),
                _ => {
                    return Err(ApiError::Validation(
                        "all fields are required: solicitud_id, tipo_documento and tipo_solicitud"
                            .to_string(),
                    ))
                }
            };
        let tipo_solicitud = parse_kind(&tipo_solicitud)?;

        let stored = self
            .files
            .save(UPLOAD_FIELD, &file.original_name, &file.mime, &file.bytes)
            .map_err(|err| ApiError::internal("error storing the uploaded file", err))?;

        let draft = AttachmentDraft {
            tipo_solicitud,
            solicitud_id,
            tipo_documento,
            nombre_archivo: stored.nombre_original.clone(),
            ruta_archivo: stored.ruta.clone(),
        };

        match self.store.insert(draft) {
            Ok(attachment) => Ok((attachment, stored)),
            Err(err) => {
                // Compensating action; the insert failure still wins.
                if let Err(cleanup) = self.files.remove(&stored.nombre_almacenado) {
                    warn!(
                        file = %stored.nombre_almacenado,
                        error = %cleanup,
                        "failed to remove orphaned upload after insert failure"
                    );
                }
                Err(err.for_entity(ENTITY, ""))
            }
        }
    }

    pub fn get(&self, id: i64) -> Result<Attachment, ApiError> {
        self.store
            .fetch(id)
            .map_err(|err| err.for_entity(ENTITY, ""))?
            .ok_or(ApiError::NotFound(ENTITY))
    }

    pub fn list(&self, filter: AttachmentFilter) -> Result<Vec<Attachment>, ApiError> {
        self.store
            .filtered(&filter)
            .map_err(|err| err.for_entity(ENTITY, ""))
    }

    pub fn by_request(&self, tipo: &str, solicitud_id: i64) -> Result<Vec<Attachment>, ApiError> {
        let kind = parse_kind(tipo)?;
        self.store
            .by_request(RequestRef {
                kind,
                id: solicitud_id,
            })
            .map_err(|err| err.for_entity(ENTITY, ""))
    }

    pub fn by_student(&self, estudiante_id: i64) -> Result<Vec<Attachment>, ApiError> {
        self.store
            .by_student(estudiante_id)
            .map_err(|err| err.for_entity(ENTITY, ""))
    }

    pub fn update(&self, id: i64, payload: AttachmentPayload) -> Result<(), ApiError> {
        let mut changes = AttachmentChanges::default();
        if let Some(raw) = payload.tipo_solicitud {
            changes.tipo_solicitud = Some(parse_kind(&raw)?);
        }
        changes.solicitud_id = payload.solicitud_id;
        changes.tipo_documento = payload.tipo_documento;
        changes.nombre_archivo = payload.nombre_archivo;
        changes.ruta_archivo = payload.ruta_archivo;

        if changes.is_empty() {
            return Err(ApiError::Validation("no fields to update".to_string()));
        }
        let affected = self
            .store
            .update(id, &changes)
            .map_err(|err| err.for_entity(ENTITY, ""))?;
        if affected == 0 {
            return Err(ApiError::NotFound(ENTITY));
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<(), ApiError> {
        let affected = self
            .store
            .delete(id)
            .map_err(|err| err.for_entity(ENTITY, ""))?;
        if affected == 0 {
            return Err(ApiError::NotFound(ENTITY));
        }
        Ok(())
    }
}
