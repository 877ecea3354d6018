use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;
use crate::store::StoreError;
use crate::validate;

/// A guardian as stored in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guardian {
    pub id: i64,
    pub nombre: String,
    pub dni: String,
    pub parentesco: String,
    pub ocupacion: String,
    pub grado_instruccion: String,
    pub telefono: String,
    pub email: String,
    pub direccion: String,
}

#[derive(Debug, Clone)]
pub struct NewGuardianRecord {
    pub nombre: String,
    pub dni: String,
    pub parentesco: String,
    pub ocupacion: String,
    pub grado_instruccion: String,
    pub telefono: String,
    pub email: String,
    pub direccion: String,
}

#[derive(Debug, Clone, Default)]
pub struct GuardianChanges {
    pub nombre: Option<String>,
    pub dni: Option<String>,
    pub parentesco: Option<String>,
    pub ocupacion: Option<String>,
    pub grado_instruccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub direccion: Option<String>,
}

impl GuardianChanges {
    pub fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.dni.is_none()
            && self.parentesco.is_none()
            && self.ocupacion.is_none()
            && self.grado_instruccion.is_none()
            && self.telefono.is_none()
            && self.email.is_none()
            && self.direccion.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GuardianPayload {
    pub nombre: Option<String>,
    pub dni: Option<String>,
    pub parentesco: Option<String>,
    pub ocupacion: Option<String>,
    pub grado_instruccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub direccion: Option<String>,
}

/// Storage abstraction over the guardians table.
pub trait GuardianStore: Send + Sync {
    fn insert(&self, record: NewGuardianRecord) -> Result<Guardian, StoreError>;
    fn fetch(&self, id: i64) -> Result<Option<Guardian>, StoreError>;
    fn fetch_by_dni(&self, dni: &str) -> Result<Option<Guardian>, StoreError>;
    fn list(&self) -> Result<Vec<Guardian>, StoreError>;
    fn update(&self, id: i64, changes: &GuardianChanges) -> Result<usize, StoreError>;
    fn delete(&self, id: i64) -> Result<usize, StoreError>;
}

const DELETE_RESTRICTED: &str =
    "the guardian cannot be deleted because student links reference it";

fn validate_dni(dni: &str) -> Result<(), ApiError> {
    if validate::is_dni(dni) {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "dni must be 8 numeric digits".to_string(),
        ))
    }
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if validate::is_email(email) {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "the email format is not valid".to_string(),
        ))
    }
}

pub struct GuardianDirectory {
    store: Arc<dyn GuardianStore>,
}

impl GuardianDirectory {
    pub fn new(store: Arc<dyn GuardianStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn GuardianStore> {
        self.store.clone()
    }

    pub fn list(&self) -> Result<Vec<Guardian>, ApiError> {
        self.store
            .list()
            .map_err(|err| err.for_entity("guardian", DELETE_RESTRICTED))
    }

    pub fn get(&self, id: i64) -> Result<Guardian, ApiError> {
        self.store
            .fetch(id)
            .map_err(|err| err.for_entity("guardian", DELETE_RESTRICTED))?
            .ok_or(ApiError::NotFound("guardian"))
    }

    /// First-class read: the enrollment front end resolves guardians by
    /// national id before it has any internal id.
    pub fn find_by_dni(&self, dni: &str) -> Result<Guardian, ApiError> {
        validate_dni(dni)?;
        self.store
            .fetch_by_dni(dni)
            .map_err(|err| err.for_entity("guardian", DELETE_RESTRICTED))?
            .ok_or(ApiError::NotFound("guardian"))
    }

    pub fn create(&self, payload: GuardianPayload) -> Result<Guardian, ApiError> {
        let record = match (
            payload.nombre,
            payload.dni,
            payload.parentesco,
            payload.ocupacion,
            payload.grado_instruccion,
            payload.telefono,
            payload.email,
            payload.direccion,
        ) {
            (
                Some(nombre),
                Some(dni),
                Some(parentesco),
                Some(ocupacion),
                Some(grado_instruccion),
                Some(telefono),
                Some(email),
                Some(direccion),
            ) => NewGuardianRecord {
                nombre,
                dni,
                parentesco,
                ocupacion,
                grado_instruccion,
                telefono,
                email,
                direccion,
            },
            _ => {
                return Err(ApiError::Validation(
                    "all fields are required: nombre, dni, parentesco, ocupacion, grado_instruccion, telefono, email, direccion"
                        .to_string(),
                ))
            }
        };

        validate_dni(&record.dni)?;
        validate_email(&record.email)?;

        self.store
            .insert(record)
            .map_err(|err| err.for_entity("guardian", DELETE_RESTRICTED))
    }

    pub fn update(&self, id: i64, payload: GuardianPayload) -> Result<(), ApiError> {
        if let Some(dni) = payload.dni.as_deref() {
            validate_dni(dni)?;
        }
        if let Some(email) = payload.email.as_deref() {
            validate_email(email)?;
        }

        let changes = GuardianChanges {
            nombre: payload.nombre,
            dni: payload.dni,
            parentesco: payload.parentesco,
            ocupacion: payload.ocupacion,
            grado_instruccion: payload.grado_instruccion,
            telefono: payload.telefono,
            email: payload.email,
            direccion: payload.direccion,
        };
        if changes.is_empty() {
            return Err(ApiError::Validation("no fields to update".to_string()));
        }

        let affected = self
            .store
            .update(id, &changes)
            .map_err(|err| err.for_entity("guardian", DELETE_RESTRICTED))?;
        if affected == 0 {
            return Err(ApiError::NotFound("guardian"));
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<(), ApiError> {
        let affected = self
            .store
            .delete(id)
            .map_err(|err| err.for_entity("guardian", DELETE_RESTRICTED))?;
        if affected == 0 {
            return Err(ApiError::NotFound("guardian"));
        }
        Ok(())
    }
}

pub fn guardian_router(directory: Arc<GuardianDirectory>) -> Router {
    Router::new()
        .route(
            "/api/apoderados",
            get(list_guardians).post(create_guardian),
        )
        .route(
            "/api/apoderados/:id",
            get(get_guardian).put(update_guardian).delete(delete_guardian),
        )
        .route("/api/buscar/:dni", get(find_guardian_by_dni))
        .with_state(directory)
}

async fn list_guardians(
    State(directory): State<Arc<GuardianDirectory>>,
) -> Result<Json<Vec<Guardian>>, ApiError> {
    Ok(Json(directory.list()?))
}

async fn get_guardian(
    State(directory): State<Arc<GuardianDirectory>>,
    Path(id): Path<i64>,
) -> Result<Json<Guardian>, ApiError> {
    Ok(Json(directory.get(id)?))
}

async fn find_guardian_by_dni(
    State(directory): State<Arc<GuardianDirectory>>,
    Path(dni): Path<String>,
) -> Result<Json<Guardian>, ApiError> {
    Ok(Json(directory.find_by_dni(&dni)?))
}

async fn create_guardian(
    State(directory): State<Arc<GuardianDirectory>>,
    Json(payload): Json<GuardianPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let guardian = directory.create(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": guardian.id, "message": "guardian created successfully" })),
    ))
}

async fn update_guardian(
    State(directory): State<Arc<GuardianDirectory>>,
    Path(id): Path<i64>,
    Json(payload): Json<GuardianPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    directory.update(id, payload)?;
    Ok(Json(json!({ "message": "guardian updated successfully" })))
}

async fn delete_guardian(
    State(directory): State<Arc<GuardianDirectory>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    directory.delete(id)?;
    Ok(Json(json!({ "message": "guardian deleted successfully" })))
}
