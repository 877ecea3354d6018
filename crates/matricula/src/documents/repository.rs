use crate::enrollment::domain::RequestRef;
use crate::store::StoreError;

use super::domain::{Attachment, AttachmentChanges, AttachmentDraft, AttachmentFilter, StoredFile};

/// Storage abstraction over the documents table.
pub trait AttachmentStore: Send + Sync {
    fn insert(&self, draft: AttachmentDraft) -> Result<Attachment, StoreError>;
    fn fetch(&self, id: i64) -> Result<Option<Attachment>, StoreError>;
    /// Conjunctive filter listing, newest rows first. An empty filter
    /// lists everything.
    fn filtered(&self, filter: &AttachmentFilter) -> Result<Vec<Attachment>, StoreError>;
    fn by_request(&self, reference: RequestRef) -> Result<Vec<Attachment>, StoreError>;
    /// Union across the three request tables: New/Transfer rows join
    /// via the student's denormalized DNI, Promotion rows via the
    /// student FK.
    fn by_student(&self, estudiante_id: i64) -> Result<Vec<Attachment>, StoreError>;
    fn update(&self, id: i64, changes: &AttachmentChanges) -> Result<usize, StoreError>;
    fn delete(&self, id: i64) -> Result<usize, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("file store error: {0}")]
    Io(String),
}

/// The external upload collaborator: it persists accepted bytes and can
/// remove a stored file again when a later step fails.
pub trait FileStore: Send + Sync {
    fn save(
        &self,
        field: &str,
        original_name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, FileStoreError>;
    fn remove(&self, stored_name: &str) -> Result<(), FileStoreError>;
}
