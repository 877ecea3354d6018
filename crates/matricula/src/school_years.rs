use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;
use crate::store::StoreError;
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchoolYearStatus {
    #[serde(rename = "activo")]
    Active,
    #[serde(rename = "finalizado")]
    Finished,
    #[serde(rename = "planificado")]
    Planned,
}

impl SchoolYearStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "activo" => Some(Self::Active),
            "finalizado" => Some(Self::Finished),
            "planificado" => Some(Self::Planned),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "activo",
            Self::Finished => "finalizado",
            Self::Planned => "planificado",
        }
    }
}

/// An academic year span. `anio` is the 4-digit label used as the wire
/// key throughout the request tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolYear {
    pub id: i64,
    pub anio: String,
    pub descripcion: Option<String>,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub estado: SchoolYearStatus,
}

#[derive(Debug, Clone)]
pub struct NewSchoolYearRecord {
    pub anio: String,
    pub descripcion: Option<String>,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub estado: SchoolYearStatus,
}

#[derive(Debug, Clone, Default)]
pub struct SchoolYearChanges {
    pub anio: Option<String>,
    pub descripcion: Option<Option<String>>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub estado: Option<SchoolYearStatus>,
}

impl SchoolYearChanges {
    pub fn is_empty(&self) -> bool {
        self.anio.is_none()
            && self.descripcion.is_none()
            && self.fecha_inicio.is_none()
            && self.fecha_fin.is_none()
            && self.estado.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SchoolYearPayload {
    pub anio: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub descripcion: Option<Option<String>>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub estado: Option<String>,
}

/// Distinguishes an absent key from an explicit null so `descripcion`
/// can be cleared by sending null.
fn deserialize_some<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Storage abstraction over the school-years table.
pub trait SchoolYearStore: Send + Sync {
    fn insert(&self, record: NewSchoolYearRecord) -> Result<SchoolYear, StoreError>;
    fn fetch(&self, id: i64) -> Result<Option<SchoolYear>, StoreError>;
    fn fetch_by_year(&self, anio: &str) -> Result<Option<SchoolYear>, StoreError>;
    fn active(&self) -> Result<Option<SchoolYear>, StoreError>;
    fn list(&self) -> Result<Vec<SchoolYear>, StoreError>;
    fn update(&self, id: i64, changes: &SchoolYearChanges) -> Result<usize, StoreError>;
    fn delete(&self, id: i64) -> Result<usize, StoreError>;
}

const DELETE_RESTRICTED: &str =
    "the school year cannot be deleted because related records exist";

fn validate_label(anio: &str) -> Result<(), ApiError> {
    if validate::is_year_label(anio) {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "the year must be 4 numeric digits".to_string(),
        ))
    }
}

fn validate_span(inicio: NaiveDate, fin: NaiveDate) -> Result<(), ApiError> {
    if inicio >= fin {
        return Err(ApiError::Validation(
            "start date must precede end date".to_string(),
        ));
    }
    Ok(())
}

/// Registry over academic years: CRUD plus the active-year and by-label
/// reads. Exactly one year may be active; the write path enforces it.
pub struct SchoolYearRegistry {
    store: Arc<dyn SchoolYearStore>,
}

impl SchoolYearRegistry {
    pub fn new(store: Arc<dyn SchoolYearStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn SchoolYearStore> {
        self.store.clone()
    }

    pub fn list(&self) -> Result<Vec<SchoolYear>, ApiError> {
        self.store
            .list()
            .map_err(|err| err.for_entity("school year", DELETE_RESTRICTED))
    }

    pub fn get(&self, id: i64) -> Result<SchoolYear, ApiError> {
        self.store
            .fetch(id)
            .map_err(|err| err.for_entity("school year", DELETE_RESTRICTED))?
            .ok_or(ApiError::NotFound("school year"))
    }

    pub fn get_by_year(&self, anio: &str) -> Result<SchoolYear, ApiError> {
        validate_label(anio)?;
        self.store
            .fetch_by_year(anio)
            .map_err(|err| err.for_entity("school year", DELETE_RESTRICTED))?
            .ok_or(ApiError::NotFound("school year"))
    }

    pub fn active(&self) -> Result<SchoolYear, ApiError> {
        self.store
            .active()
            .map_err(|err| err.for_entity("school year", DELETE_RESTRICTED))?
            .ok_or(ApiError::NotFound("active school year"))
    }

    fn guard_single_active(&self, candidate_id: Option<i64>) -> Result<(), ApiError> {
        let current = self
            .store
            .active()
            .map_err(|err| err.for_entity("school year", DELETE_RESTRICTED))?;
        match current {
            Some(year) if Some(year.id) != candidate_id => Err(ApiError::Validation(format!(
                "another school year is already active ({})",
                year.anio
            ))),
            _ => Ok(()),
        }
    }

    pub fn create(&self, payload: SchoolYearPayload) -> Result<SchoolYear, ApiError> {
        let (anio, fecha_inicio, fecha_fin) =
            match (payload.anio, payload.fecha_inicio, payload.fecha_fin) {
                (Some(a), Some(i), Some(f)) => (a, i, f),
                _ => {
                    return Err(ApiError::Validation(
                        "the fields anio, fecha_inicio and fecha_fin are required".to_string(),
                    ))
                }
            };

        validate_label(&anio)?;
        let fecha_inicio = validate::parse_date(&fecha_inicio)
            .map_err(|_| ApiError::Validation("the start date is not valid".to_string()))?;
        let fecha_fin = validate::parse_date(&fecha_fin)
            .map_err(|_| ApiError::Validation("the end date is not valid".to_string()))?;
        validate_span(fecha_inicio, fecha_fin)?;

        let estado = match payload.estado.as_deref() {
            None => SchoolYearStatus::Planned,
            Some(raw) => SchoolYearStatus::parse(raw).ok_or_else(|| {
                ApiError::Validation(
                    "the status must be one of: activo, finalizado, planificado".to_string(),
                )
            })?,
        };
        if estado == SchoolYearStatus::Active {
            self.guard_single_active(None)?;
        }

        self.store
            .insert(NewSchoolYearRecord {
                anio,
                descripcion: payload.descripcion.flatten(),
                fecha_inicio,
                fecha_fin,
                estado,
            })
            .map_err(|err| err.for_entity("school year", DELETE_RESTRICTED))
    }

    pub fn update(&self, id: i64, payload: SchoolYearPayload) -> Result<(), ApiError> {
        let mut changes = SchoolYearChanges::default();

        if let Some(anio) = payload.anio {
            validate_label(&anio)?;
            changes.anio = Some(anio);
        }
        if let Some(raw) = payload.fecha_inicio {
            changes.fecha_inicio = Some(
                validate::parse_date(&raw)
                    .map_err(|_| ApiError::Validation("the start date is not valid".to_string()))?,
            );
        }
        if let Some(raw) = payload.fecha_fin {
            changes.fecha_fin = Some(
                validate::parse_date(&raw)
                    .map_err(|_| ApiError::Validation("the end date is not valid".to_string()))?,
            );
        }
        if let (Some(inicio), Some(fin)) = (changes.fecha_inicio, changes.fecha_fin) {
            validate_span(inicio, fin)?;
        }
        if let Some(raw) = payload.estado {
            let estado = SchoolYearStatus::parse(&raw).ok_or_else(|| {
                ApiError::Validation(
                    "the status must be one of: activo, finalizado, planificado".to_string(),
                )
            })?;
            if estado == SchoolYearStatus::Active {
                self.guard_single_active(Some(id))?;
            }
            changes.estado = Some(estado);
        }
        changes.descripcion = payload.descripcion;

        if changes.is_empty() {
            return Err(ApiError::Validation("no fields to update".to_string()));
        }

        let affected = self
            .store
            .update(id, &changes)
            .map_err(|err| err.for_entity("school year", DELETE_RESTRICTED))?;
        if affected == 0 {
            return Err(ApiError::NotFound("school year"));
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<(), ApiError> {
        let affected = self
            .store
            .delete(id)
            .map_err(|err| err.for_entity("school year", DELETE_RESTRICTED))?;
        if affected == 0 {
            return Err(ApiError::NotFound("school year"));
        }
        Ok(())
    }
}

pub fn school_year_router(registry: Arc<SchoolYearRegistry>) -> Router {
    Router::new()
        .route(
            "/api/anios-escolares",
            get(list_years).post(create_year),
        )
        .route("/api/anios-escolares/activo", get(get_active_year))
        .route("/api/anios-escolares/anio/:anio", get(get_year_by_label))
        .route(
            "/api/anios-escolares/:id",
            get(get_year).put(update_year).delete(delete_year),
        )
        .with_state(registry)
}

async fn list_years(
    State(registry): State<Arc<SchoolYearRegistry>>,
) -> Result<Json<Vec<SchoolYear>>, ApiError> {
    Ok(Json(registry.list()?))
}

async fn get_year(
    State(registry): State<Arc<SchoolYearRegistry>>,
    Path(id): Path<i64>,
) -> Result<Json<SchoolYear>, ApiError> {
    Ok(Json(registry.get(id)?))
}

async fn get_year_by_label(
    State(registry): State<Arc<SchoolYearRegistry>>,
    Path(anio): Path<String>,
) -> Result<Json<SchoolYear>, ApiError> {
    Ok(Json(registry.get_by_year(&anio)?))
}

async fn get_active_year(
    State(registry): State<Arc<SchoolYearRegistry>>,
) -> Result<Json<SchoolYear>, ApiError> {
    Ok(Json(registry.active()?))
}

async fn create_year(
    State(registry): State<Arc<SchoolYearRegistry>>,
    Json(payload): Json<SchoolYearPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let year = registry.create(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": year.id, "message": "school year created successfully" })),
    ))
}

async fn update_year(
    State(registry): State<Arc<SchoolYearRegistry>>,
    Path(id): Path<i64>,
    Json(payload): Json<SchoolYearPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    registry.update(id, payload)?;
    Ok(Json(json!({ "message": "school year updated successfully" })))
}

async fn delete_year(
    State(registry): State<Arc<SchoolYearRegistry>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    registry.delete(id)?;
    Ok(Json(json!({ "message": "school year deleted successfully" })))
}
