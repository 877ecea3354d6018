//! Uploaded documents attached to enrollment requests.
//!
//! Rows reference requests by `(tipo_solicitud, solicitud_id)` only;
//! the reference spans three physical tables, so no foreign key backs
//! it and deleting a request never cascades here.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{Attachment, AttachmentFilter, StoredFile, ALLOWED_MIME_TYPES, UPLOAD_FIELD};
pub use repository::{AttachmentStore, FileStore, FileStoreError};
pub use router::document_router;
pub use service::AttachmentService;
