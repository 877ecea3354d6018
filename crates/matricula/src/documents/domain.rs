use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::enrollment::domain::RequestKind;

/// Multipart field name the upload must arrive under.
pub const UPLOAD_FIELD: &str = "documento";

/// PDFs, Word documents, and common image formats.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// A stored document row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub tipo_solicitud: RequestKind,
    pub solicitud_id: i64,
    pub tipo_documento: String,
    pub nombre_archivo: String,
    pub ruta_archivo: String,
    pub created_at: NaiveDateTime,
}

/// What the external file collaborator reports back after persisting
/// an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFile {
    pub nombre_original: String,
    pub nombre_almacenado: String,
    pub ruta: String,
    pub size: u64,
    pub mime: String,
}

#[derive(Debug, Clone)]
pub struct AttachmentDraft {
    pub tipo_solicitud: RequestKind,
    pub solicitud_id: i64,
    pub tipo_documento: String,
    pub nombre_archivo: String,
    pub ruta_archivo: String,
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentChanges {
    pub tipo_solicitud: Option<RequestKind>,
    pub solicitud_id: Option<i64>,
    pub tipo_documento: Option<String>,
    pub nombre_archivo: Option<String>,
    pub ruta_archivo: Option<String>,
}

impl AttachmentChanges {
    pub fn is_empty(&self) -> bool {
        self.tipo_solicitud.is_none()
            && self.solicitud_id.is_none()
            && self.tipo_documento.is_none()
            && self.nombre_archivo.is_none()
            && self.ruta_archivo.is_none()
    }
}

/// Conjunctive listing filter; only the supplied predicates apply.
#[derive(Debug, Clone, Default)]
pub struct AttachmentFilter {
    pub tipo_solicitud: Option<RequestKind>,
    pub solicitud_id: Option<i64>,
    pub tipo_documento: Option<String>,
}

impl AttachmentFilter {
    pub fn is_empty(&self) -> bool {
        self.tipo_solicitud.is_none()
            && self.solicitud_id.is_none()
            && self.tipo_documento.is_none()
    }
}

/// An upload as parsed from the multipart body, before any policy
/// checks have run.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub original_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AttachmentPayload {
    pub tipo_solicitud: Option<String>,
    pub solicitud_id: Option<i64>,
    pub tipo_documento: Option<String>,
    pub nombre_archivo: Option<String>,
    pub ruta_archivo: Option<String>,
}
