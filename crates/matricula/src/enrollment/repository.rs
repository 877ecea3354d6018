use crate::store::StoreError;

use super::domain::{
    NewEnrollmentChanges, NewEnrollmentDraft, NewEnrollmentRequest, PromotionChanges,
    PromotionDraft, PromotionRequest, TransferChanges, TransferDraft, TransferRequest,
};

/// Storage abstraction over the new-enrollment table.
pub trait NewRequestStore: Send + Sync {
    fn insert(&self, draft: NewEnrollmentDraft) -> Result<i64, StoreError>;
    fn fetch(&self, id: i64) -> Result<Option<NewEnrollmentRequest>, StoreError>;
    fn list(&self) -> Result<Vec<NewEnrollmentRequest>, StoreError>;
    fn by_year(&self, anio: &str) -> Result<Vec<NewEnrollmentRequest>, StoreError>;
    fn by_student_dni(&self, dni: &str) -> Result<Vec<NewEnrollmentRequest>, StoreError>;
    fn update(&self, id: i64, changes: &NewEnrollmentChanges) -> Result<usize, StoreError>;
    fn delete(&self, id: i64) -> Result<usize, StoreError>;
}

/// Storage abstraction over the transfer table.
pub trait TransferRequestStore: Send + Sync {
    fn insert(&self, draft: TransferDraft) -> Result<i64, StoreError>;
    fn fetch(&self, id: i64) -> Result<Option<TransferRequest>, StoreError>;
    fn list(&self) -> Result<Vec<TransferRequest>, StoreError>;
    fn by_year(&self, anio: &str) -> Result<Vec<TransferRequest>, StoreError>;
    fn by_student_dni(&self, dni: &str) -> Result<Vec<TransferRequest>, StoreError>;
    fn update(&self, id: i64, changes: &TransferChanges) -> Result<usize, StoreError>;
    fn delete(&self, id: i64) -> Result<usize, StoreError>;
}

/// Storage abstraction over the promotion table. The by-student reads
/// go through the student FK rather than a denormalized DNI column.
pub trait PromotionRequestStore: Send + Sync {
    fn insert(&self, draft: PromotionDraft) -> Result<i64, StoreError>;
    fn fetch(&self, id: i64) -> Result<Option<PromotionRequest>, StoreError>;
    fn list(&self) -> Result<Vec<PromotionRequest>, StoreError>;
    fn by_current_year(&self, anio: &str) -> Result<Vec<PromotionRequest>, StoreError>;
    fn by_next_year(&self, anio: &str) -> Result<Vec<PromotionRequest>, StoreError>;
    fn by_student(&self, estudiante_id: i64) -> Result<Vec<PromotionRequest>, StoreError>;
    fn update(&self, id: i64, changes: &PromotionChanges) -> Result<usize, StoreError>;
    fn delete(&self, id: i64) -> Result<usize, StoreError>;
}
