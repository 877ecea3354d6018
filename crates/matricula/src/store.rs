use crate::error::ApiError;

/// Failures surfaced by the table-backed stores.
///
/// Constraint violations arrive here already classified; the backends
/// pattern-match the database error text so the services never see raw
/// driver messages.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate value for {field}")]
    Conflict { field: String },
    #[error("row is referenced by other records")]
    Referenced,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Translate a store failure into the HTTP taxonomy for a given entity.
    ///
    /// `referenced` carries the domain-readable message for delete
    /// restrictions ("the student cannot be deleted because …").
    pub fn for_entity(self, entity: &'static str, referenced: &str) -> ApiError {
        match self {
            StoreError::NotFound => ApiError::NotFound(entity),
            StoreError::Conflict { field } => {
                ApiError::Conflict(format!("a {entity} with this {field} already exists"))
            }
            StoreError::Referenced => ApiError::Referenced(referenced.to_string()),
            StoreError::Unavailable(detail) => {
                ApiError::internal(format!("error accessing the {entity} store"), detail)
            }
        }
    }
}
