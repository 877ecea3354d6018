//! Staff remarks attached to enrollment requests.
//!
//! Same weak `(tipo_solicitud, solicitud_id)` reference as documents.
//! The category enumeration is configuration-driven because the product
//! carries two historical sets; see `config::ObservationCategories`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ObservationCategories;
use crate::enrollment::domain::{RequestKind, RequestRef};
use crate::error::ApiError;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub tipo_solicitud: RequestKind,
    pub solicitud_id: i64,
    pub fecha_creacion: NaiveDateTime,
    pub tipo: String,
    pub descripcion: String,
    pub es_visible_para_padres: bool,
}

#[derive(Debug, Clone)]
pub struct ObservationDraft {
    pub tipo_solicitud: RequestKind,
    pub solicitud_id: i64,
    pub tipo: String,
    pub descripcion: String,
    pub es_visible_para_padres: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ObservationChanges {
    pub tipo_solicitud: Option<RequestKind>,
    pub solicitud_id: Option<i64>,
    pub tipo: Option<String>,
    pub descripcion: Option<String>,
    pub es_visible_para_padres: Option<bool>,
}

impl ObservationChanges {
    pub fn is_empty(&self) -> bool {
        self.tipo_solicitud.is_none()
            && self.solicitud_id.is_none()
            && self.tipo.is_none()
            && self.descripcion.is_none()
            && self.es_visible_para_padres.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ObservationPayload {
    pub tipo_solicitud: Option<String>,
    pub solicitud_id: Option<i64>,
    pub tipo: Option<String>,
    pub descripcion: Option<String>,
    pub es_visible_para_padres: Option<bool>,
}

/// Storage abstraction over the observations table.
pub trait ObservationStore: Send + Sync {
    fn insert(&self, draft: ObservationDraft) -> Result<Observation, StoreError>;
    fn fetch(&self, id: i64) -> Result<Option<Observation>, StoreError>;
    /// All rows, newest first.
    fn list(&self) -> Result<Vec<Observation>, StoreError>;
    /// Rows for one request, newest first.
    fn by_request(&self, reference: RequestRef) -> Result<Vec<Observation>, StoreError>;
    /// `by_request` narrowed to parent-visible rows.
    fn visible_by_request(&self, reference: RequestRef) -> Result<Vec<Observation>, StoreError>;
    fn update(&self, id: i64, changes: &ObservationChanges) -> Result<usize, StoreError>;
    fn delete(&self, id: i64) -> Result<usize, StoreError>;
}

const ENTITY: &str = "observation";

fn parse_kind(raw: &str) -> Result<RequestKind, ApiError> {
    RequestKind::parse(raw).ok_or_else(|| {
        ApiError::Validation(format!(
            "invalid request type. Must be one of: {}",
            RequestKind::ALLOWED
        ))
    })
}

pub struct ObservationService {
    store: Arc<dyn ObservationStore>,
    categories: ObservationCategories,
}

impl ObservationService {
    pub fn new(store: Arc<dyn ObservationStore>, categories: ObservationCategories) -> Self {
        Self { store, categories }
    }

    fn parse_category(&self, raw: &str) -> Result<String, ApiError> {
        if self.categories.accepts(raw) {
            Ok(raw.to_string())
        } else {
            Err(ApiError::Validation(format!(
                "invalid observation category. Must be one of: {}",
                self.categories.allowed().join(", ")
            )))
        }
    }

    pub fn list(&self) -> Result<Vec<Observation>, ApiError> {
        self.store.list().map_err(|err| err.for_entity(ENTITY, ""))
    }

    pub fn get(&self, id: i64) -> Result<Observation, ApiError> {
        self.store
            .fetch(id)
            .map_err(|err| err.for_entity(ENTITY, ""))?
            .ok_or(ApiError::NotFound(ENTITY))
    }

    pub fn by_request(&self, tipo: &str, solicitud_id: i64) -> Result<Vec<Observation>, ApiError> {
        let kind = parse_kind(tipo)?;
        self.store
            .by_request(RequestRef {
                kind,
                id: solicitud_id,
            })
            .map_err(|err| err.for_entity(ENTITY, ""))
    }

    pub fn visible_by_request(
        &self,
        tipo: &str,
        solicitud_id: i64,
    ) -> Result<Vec<Observation>, ApiError> {
        let kind = parse_kind(tipo)?;
        self.store
            .visible_by_request(RequestRef {
                kind,
                id: solicitud_id,
            })
            .map_err(|err| err.for_entity(ENTITY, ""))
    }

    pub fn create(&self, payload: ObservationPayload) -> Result<Observation, ApiError> {
        let (tipo_solicitud, solicitud_id, tipo, descripcion) = match (
            payload.tipo_solicitud,
            payload.solicitud_id,
            payload.tipo,
            payload.descripcion,
        ) {
            (Some(t), Some(i), Some(c), Some(d)) => (t, i, c, d),
            _ => {
                return Err(ApiError::Validation(
                    "the fields tipo_solicitud, solicitud_id, tipo and descripcion are required"
                        .to_string(),
                ))
            }
        };

        let tipo_solicitud = parse_kind(&tipo_solicitud)?;
        let tipo = self.parse_category(&tipo)?;

        self.store
            .insert(ObservationDraft {
                tipo_solicitud,
                solicitud_id,
                tipo,
                descripcion,
                es_visible_para_padres: payload.es_visible_para_padres.unwrap_or(true),
            })
            .map_err(|err| err.for_entity(ENTITY, ""))
    }

    pub fn update(&self, id: i64, payload: ObservationPayload) -> Result<(), ApiError> {
        let mut changes = ObservationChanges::default();
        if let Some(raw) = payload.tipo_solicitud {
            changes.tipo_solicitud = Some(parse_kind(&raw)?);
        }
        if let Some(raw) = payload.tipo {
            changes.tipo = Some(self.parse_category(&raw)?);
        }
        changes.solicitud_id = payload.solicitud_id;
        changes.descripcion = payload.descripcion;
        changes.es_visible_para_padres = payload.es_visible_para_padres;

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

pub fn observation_router(service: Arc<ObservationService>) -> Router {
    Router::new()
        .route(
            "/api/observaciones",
            get(list_observations).post(create_observation),
        )
        .route(
            "/api/observaciones/:id",
            get(get_observation)
                .put(update_observation)
                .delete(delete_observation),
        )
        .route(
            "/api/solicitudes/:tipo/:id/observaciones",
            get(observations_by_request),
        )
        .route(
            "/api/solicitudes/:tipo/:id/observaciones/visibles",
            get(visible_observations_by_request),
        )
        .with_state(service)
}

async fn list_observations(
    State(service): State<Arc<ObservationService>>,
) -> Result<Json<Vec<Observation>>, ApiError> {
    Ok(Json(service.list()?))
}

async fn get_observation(
    State(service): State<Arc<ObservationService>>,
    Path(id): Path<i64>,
) -> Result<Json<Observation>, ApiError> {
    Ok(Json(service.get(id)?))
}

async fn create_observation(
    State(service): State<Arc<ObservationService>>,
    Json(payload): Json<ObservationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let observation = service.create(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": observation.id, "message": "observation created successfully" })),
    ))
}

async fn update_observation(
    State(service): State<Arc<ObservationService>>,
    Path(id): Path<i64>,
    Json(payload): Json<ObservationPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.update(id, payload)?;
    Ok(Json(json!({ "message": "observation updated successfully" })))
}

async fn delete_observation(
    State(service): State<Arc<ObservationService>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.delete(id)?;
    Ok(Json(json!({ "message": "observation deleted successfully" })))
}

async fn observations_by_request(
    State(service): State<Arc<ObservationService>>,
    Path((tipo, id)): Path<(String, i64)>,
) -> Result<Json<Vec<Observation>>, ApiError> {
    Ok(Json(service.by_request(&tipo, id)?))
}

async fn visible_observations_by_request(
    State(service): State<Arc<ObservationService>>,
    Path((tipo, id)): Path<(String, i64)>,
) -> Result<Json<Vec<Observation>>, ApiError> {
    Ok(Json(service.visible_by_request(&tipo, id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryObservations {
        rows: Mutex<Vec<Observation>>,
    }

    impl MemoryObservations {
        fn stamp(sequence: i64) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2024, 11, 1)
                .expect("valid date")
                .and_hms_opt(8, 0, 0)
                .expect("valid time")
                + chrono::Duration::minutes(sequence)
        }
    }

    impl ObservationStore for MemoryObservations {
        fn insert(&self, draft: ObservationDraft) -> Result<Observation, StoreError> {
            let mut rows = self.rows.lock().expect("mutex poisoned");
            let id = rows.len() as i64 + 1;
            let observation = Observation {
                id,
                tipo_solicitud: draft.tipo_solicitud,
                solicitud_id: draft.solicitud_id,
                fecha_creacion: Self::stamp(id),
                tipo: draft.tipo,
                descripcion: draft.descripcion,
                es_visible_para_padres: draft.es_visible_para_padres,
            };
            rows.push(observation.clone());
            Ok(observation)
        }

        fn fetch(&self, id: i64) -> Result<Option<Observation>, StoreError> {
            Ok(self
                .rows
                .lock()
                .expect("mutex poisoned")
                .iter()
                .find(|o| o.id == id)
                .cloned())
        }

        fn list(&self) -> Result<Vec<Observation>, StoreError> {
            let mut all: Vec<Observation> =
                self.rows.lock().expect("mutex poisoned").clone();
            all.sort_by(|a, b| b.fecha_creacion.cmp(&a.fecha_creacion));
            Ok(all)
        }

        fn by_request(&self, reference: RequestRef) -> Result<Vec<Observation>, StoreError> {
            Ok(self
                .list()?
                .into_iter()
                .filter(|o| o.tipo_solicitud == reference.kind && o.solicitud_id == reference.id)
                .collect())
        }

        fn visible_by_request(
            &self,
            reference: RequestRef,
        ) -> Result<Vec<Observation>, StoreError> {
            Ok(self
                .by_request(reference)?
                .into_iter()
                .filter(|o| o.es_visible_para_padres)
                .collect())
        }

        fn update(&self, id: i64, changes: &ObservationChanges) -> Result<usize, StoreError> {
            let mut rows = self.rows.lock().expect("mutex poisoned");
            match rows.iter_mut().find(|o| o.id == id) {
                None => Ok(0),
                Some(observation) => {
                    if let Some(v) = changes.tipo_solicitud {
                        observation.tipo_solicitud = v;
                    }
                    if let Some(v) = changes.solicitud_id {
                        observation.solicitud_id = v;
                    }
                    if let Some(v) = &changes.tipo {
                        observation.tipo = v.clone();
                    }
                    if let Some(v) = &changes.descripcion {
                        observation.descripcion = v.clone();
                    }
                    if let Some(v) = changes.es_visible_para_padres {
                        observation.es_visible_para_padres = v;
                    }
                    Ok(1)
                }
            }
        }

        fn delete(&self, id: i64) -> Result<usize, StoreError> {
            let mut rows = self.rows.lock().expect("mutex poisoned");
            let before = rows.len();
            rows.retain(|o| o.id != id);
            Ok(before - rows.len())
        }
    }

    fn workflow_service() -> ObservationService {
        ObservationService::new(
            Arc::new(MemoryObservations::default()),
            ObservationCategories::Workflow,
        )
    }

    fn payload(tipo: &str, visible: Option<bool>) -> ObservationPayload {
        ObservationPayload {
            tipo_solicitud: Some("nueva".to_string()),
            solicitud_id: Some(3),
            tipo: Some(tipo.to_string()),
            descripcion: Some("Falta la partida de nacimiento".to_string()),
            es_visible_para_padres: visible,
        }
    }

    #[test]
    fn create_defaults_to_parent_visible() {
        let service = workflow_service();
        let observation = service
            .create(payload("comentario", None))
            .expect("observation created");
        assert!(observation.es_visible_para_padres);
    }

    #[test]
    fn category_outside_the_configured_set_lists_allowed_values() {
        let service = workflow_service();
        match service.create(payload("ACADEMICA", None)) {
            Err(ApiError::Validation(msg)) => {
                assert!(msg.contains("comentario"));
                assert!(msg.contains("petición_documentos"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn administrativa_set_swaps_the_accepted_categories() {
        let service = ObservationService::new(
            Arc::new(MemoryObservations::default()),
            ObservationCategories::Administrativa,
        );
        service
            .create(payload("ACADEMICA", None))
            .expect("category accepted under the administrativa set");
        assert!(service.create(payload("comentario", None)).is_err());
    }

    #[test]
    fn by_request_orders_newest_first_and_visibility_filters() {
        let service = workflow_service();
        service
            .create(payload("comentario", Some(true)))
            .expect("first observation");
        service
            .create(payload("rechazo", Some(false)))
            .expect("second observation");

        let all = service.by_request("nueva", 3).expect("request reads work");
        assert_eq!(all.len(), 2);
        assert!(all[0].fecha_creacion > all[1].fecha_creacion);

        let visible = service
            .visible_by_request("nueva", 3)
            .expect("visible reads work");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].tipo, "comentario");
    }

    #[test]
    fn invalid_request_kind_is_rejected_on_reads_and_writes() {
        let service = workflow_service();
        assert!(matches!(
            service.by_request("antigua", 3),
            Err(ApiError::Validation(_))
        ));
        let mut bad = payload("comentario", None);
        bad.tipo_solicitud = Some("antigua".to_string());
        assert!(matches!(service.create(bad), Err(ApiError::Validation(_))));
    }

    #[test]
    fn update_requires_at_least_one_field_and_an_existing_row() {
        let service = workflow_service();
        assert!(matches!(
            service.update(1, ObservationPayload::default()),
            Err(ApiError::Validation(_))
        ));
        let mut change = ObservationPayload::default();
        change.descripcion = Some("Documento recibido".to_string());
        assert!(matches!(
            service.update(99, change),
            Err(ApiError::NotFound(_))
        ));
    }
}
