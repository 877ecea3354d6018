use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::guardians::{Guardian, GuardianStore};
use super::students::{Student, StudentStore};
use crate::error::ApiError;
use crate::store::StoreError;

/// A student-guardian association with an optional primary flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentGuardianLink {
    pub id: i64,
    pub estudiante_id: i64,
    pub apoderado_id: i64,
    pub es_principal: bool,
}

#[derive(Debug, Clone)]
pub struct NewLinkRecord {
    pub estudiante_id: i64,
    pub apoderado_id: i64,
    pub es_principal: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinkPayload {
    pub estudiante_id: Option<i64>,
    pub apoderado_id: Option<i64>,
    pub es_principal: Option<bool>,
}

/// Storage abstraction over the link table plus its two join reads.
pub trait LinkStore: Send + Sync {
    fn insert(&self, record: NewLinkRecord) -> Result<StudentGuardianLink, StoreError>;
    fn fetch(&self, id: i64) -> Result<Option<StudentGuardianLink>, StoreError>;
    fn list(&self) -> Result<Vec<StudentGuardianLink>, StoreError>;
    fn pair_exists(&self, estudiante_id: i64, apoderado_id: i64) -> Result<bool, StoreError>;
    fn guardians_of(&self, estudiante_id: i64) -> Result<Vec<Guardian>, StoreError>;
    fn students_of(&self, apoderado_id: i64) -> Result<Vec<Student>, StoreError>;
    fn delete(&self, id: i64) -> Result<usize, StoreError>;
}

pub struct LinkService {
    links: Arc<dyn LinkStore>,
    students: Arc<dyn StudentStore>,
    guardians: Arc<dyn GuardianStore>,
}

impl LinkService {
    pub fn new(
        links: Arc<dyn LinkStore>,
        students: Arc<dyn StudentStore>,
        guardians: Arc<dyn GuardianStore>,
    ) -> Self {
        Self {
            links,
            students,
            guardians,
        }
    }

    pub fn list(&self) -> Result<Vec<StudentGuardianLink>, ApiError> {
        self.links.list().map_err(|err| err.for_entity("link", ""))
    }

    pub fn get(&self, id: i64) -> Result<StudentGuardianLink, ApiError> {
        self.links
            .fetch(id)
            .map_err(|err| err.for_entity("link", ""))?
            .ok_or(ApiError::NotFound("link"))
    }

    /// Both ids are resolved through their directories before insertion;
    /// the two checks run sequentially and are not transactional.
    pub fn create(&self, payload: LinkPayload) -> Result<StudentGuardianLink, ApiError> {
        let (estudiante_id, apoderado_id) = match (payload.estudiante_id, payload.apoderado_id) {
            (Some(s), Some(a)) => (s, a),
            _ => {
                return Err(ApiError::Validation(
                    "all fields are required: estudiante_id, apoderado_id".to_string(),
                ))
            }
        };

        self.students
            .fetch(estudiante_id)
            .map_err(|err| err.for_entity("student", ""))?
            .ok_or(ApiError::NotFound("student"))?;
        self.guardians
            .fetch(apoderado_id)
            .map_err(|err| err.for_entity("guardian", ""))?
            .ok_or(ApiError::NotFound("guardian"))?;

        // The table keeps a plain surrogate key; the pair invariant is ours.
        if self
            .links
            .pair_exists(estudiante_id, apoderado_id)
            .map_err(|err| err.for_entity("link", ""))?
        {
            return Err(ApiError::Conflict(
                "the student is already linked to this guardian".to_string(),
            ));
        }

        self.links
            .insert(NewLinkRecord {
                estudiante_id,
                apoderado_id,
                es_principal: payload.es_principal.unwrap_or(false),
            })
            .map_err(|err| err.for_entity("link", ""))
    }

    pub fn delete(&self, id: i64) -> Result<(), ApiError> {
        let affected = self
            .links
            .delete(id)
            .map_err(|err| err.for_entity("link", ""))?;
        if affected == 0 {
            return Err(ApiError::NotFound("link"));
        }
        Ok(())
    }

    pub fn guardians_of(&self, estudiante_id: i64) -> Result<Vec<Guardian>, ApiError> {
        self.students
            .fetch(estudiante_id)
            .map_err(|err| err.for_entity("student", ""))?
            .ok_or(ApiError::NotFound("student"))?;
        self.links
            .guardians_of(estudiante_id)
            .map_err(|err| err.for_entity("link", ""))
    }

    pub fn students_of(&self, apoderado_id: i64) -> Result<Vec<Student>, ApiError> {
        self.guardians
            .fetch(apoderado_id)
            .map_err(|err| err.for_entity("guardian", ""))?
            .ok_or(ApiError::NotFound("guardian"))?;
        self.links
            .students_of(apoderado_id)
            .map_err(|err| err.for_entity("link", ""))
    }
}

pub fn link_router(service: Arc<LinkService>) -> Router {
    Router::new()
        .route("/api/relaciones", get(list_links).post(create_link))
        .route("/api/relaciones/:id", get(get_link).delete(delete_link))
        .route(
            "/api/estudiantes/:id/apoderados",
            get(guardians_of_student),
        )
        .route(
            "/api/apoderados/:id/estudiantes",
            get(students_of_guardian),
        )
        .with_state(service)
}

async fn list_links(
    State(service): State<Arc<LinkService>>,
) -> Result<Json<Vec<StudentGuardianLink>>, ApiError> {
    Ok(Json(service.list()?))
}

async fn get_link(
    State(service): State<Arc<LinkService>>,
    Path(id): Path<i64>,
) -> Result<Json<StudentGuardianLink>, ApiError> {
    Ok(Json(service.get(id)?))
}

async fn create_link(
    State(service): State<Arc<LinkService>>,
    Json(payload): Json<LinkPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let link = service.create(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": link.id, "message": "link created successfully" })),
    ))
}

async fn delete_link(
    State(service): State<Arc<LinkService>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.delete(id)?;
    Ok(Json(json!({ "message": "link deleted successfully" })))
}

async fn guardians_of_student(
    State(service): State<Arc<LinkService>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Guardian>>, ApiError> {
    Ok(Json(service.guardians_of(id)?))
}

async fn students_of_guardian(
    State(service): State<Arc<LinkService>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Student>>, ApiError> {
    Ok(Json(service.students_of(id)?))
}
