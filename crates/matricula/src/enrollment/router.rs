use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::directory::students::DniQuery;
use crate::error::ApiError;

use super::domain::{
    DniEnvelope, NewEnrollmentRequest, NewRequestPayload, PromotionRequest,
    PromotionRequestPayload, RequestSummary, TransferRequest, TransferRequestPayload,
};
use super::service::EnrollmentService;

/// Routes for the three variant tables under `/api/solicitudes`.
pub fn request_router(service: Arc<EnrollmentService>) -> Router {
    Router::new()
        .route(
            "/api/solicitudes/nueva",
            get(list_new).post(create_new),
        )
        .route("/api/solicitudes/nueva/dni", get(new_by_dni))
        // Clients percent-encode the original "año" path segment, and
        // route matching sees the raw path; the plain-ASCII alias is
        // kept for hand-written calls.
        .route("/api/solicitudes/nueva/a%C3%B1o/:anio", get(new_by_year))
        .route("/api/solicitudes/nueva/anio/:anio", get(new_by_year))
        .route(
            "/api/solicitudes/nueva/:id",
            get(get_new).put(update_new).delete(delete_new),
        )
        .route(
            "/api/solicitudes/traslado",
            get(list_transfers).post(create_transfer),
        )
        .route("/api/solicitudes/traslado/dni", get(transfers_by_dni))
        .route(
            "/api/solicitudes/traslado/a%C3%B1o/:anio",
            get(transfers_by_year),
        )
        .route("/api/solicitudes/traslado/anio/:anio", get(transfers_by_year))
        .route(
            "/api/solicitudes/traslado/:id",
            get(get_transfer).put(update_transfer).delete(delete_transfer),
        )
        .route(
            "/api/solicitudes/siguiente",
            get(list_promotions).post(create_promotion),
        )
        .route("/api/solicitudes/siguiente/dni", get(promotions_by_dni))
        .route(
            "/api/solicitudes/siguiente/a%C3%B1o-actual/:anio",
            get(promotions_by_current_year),
        )
        .route(
            "/api/solicitudes/siguiente/anio-actual/:anio",
            get(promotions_by_current_year),
        )
        .route(
            "/api/solicitudes/siguiente/a%C3%B1o-siguiente/:anio",
            get(promotions_by_next_year),
        )
        .route(
            "/api/solicitudes/siguiente/anio-siguiente/:anio",
            get(promotions_by_next_year),
        )
        .route(
            "/api/estudiantes/:id/solicitudes/siguiente",
            get(promotions_by_student),
        )
        .route(
            "/api/solicitudes/siguiente/:id",
            get(get_promotion).put(update_promotion).delete(delete_promotion),
        )
        .with_state(service)
}

/// The legacy read surface that unifies the three variants, plus the
/// create endpoints that write straight into them.
pub fn matricula_router(service: Arc<EnrollmentService>) -> Router {
    Router::new()
        .route("/api/matriculas", get(list_matriculas))
        .route("/api/matriculas/nueva", axum::routing::post(create_new))
        .route(
            "/api/matriculas/traslado",
            axum::routing::post(create_transfer),
        )
        .route(
            "/api/matriculas/siguiente",
            axum::routing::post(create_promotion),
        )
        .route("/api/matriculas/a%C3%B1o/:anio", get(matriculas_by_year))
        .route("/api/matriculas/anio/:anio", get(matriculas_by_year))
        .route("/api/matriculas/:id", get(get_matricula))
        .route(
            "/api/estudiantes/:id/matriculas",
            get(matriculas_by_student),
        )
        .with_state(service)
}

fn require_dni(query: DniQuery) -> Result<String, ApiError> {
    query
        .dni
        .ok_or_else(|| ApiError::Validation("the student dni is required".to_string()))
}

// ---- new enrollment ----

async fn list_new(
    State(service): State<Arc<EnrollmentService>>,
) -> Result<Json<Vec<NewEnrollmentRequest>>, ApiError> {
    Ok(Json(service.list_new()?))
}

async fn get_new(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<NewEnrollmentRequest>, ApiError> {
    Ok(Json(service.get_new(id)?))
}

async fn new_by_year(
    State(service): State<Arc<EnrollmentService>>,
    Path(anio): Path<String>,
) -> Result<Json<Vec<NewEnrollmentRequest>>, ApiError> {
    Ok(Json(service.new_by_year(&anio)?))
}

async fn new_by_dni(
    State(service): State<Arc<EnrollmentService>>,
    Query(query): Query<DniQuery>,
) -> Result<Json<DniEnvelope<NewEnrollmentRequest>>, ApiError> {
    let dni = require_dni(query)?;
    Ok(Json(service.new_by_dni(&dni)?))
}

async fn create_new(
    State(service): State<Arc<EnrollmentService>>,
    Json(payload): Json<NewRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let id = service.create_new(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "new enrollment request created successfully" })),
    ))
}

async fn update_new(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
    Json(payload): Json<NewRequestPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.update_new(id, payload)?;
    Ok(Json(
        json!({ "message": "new enrollment request updated successfully" }),
    ))
}

async fn delete_new(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.delete_new(id)?;
    Ok(Json(
        json!({ "message": "new enrollment request deleted successfully" }),
    ))
}

// ---- transfer ----

async fn list_transfers(
    State(service): State<Arc<EnrollmentService>>,
) -> Result<Json<Vec<TransferRequest>>, ApiError> {
    Ok(Json(service.list_transfers()?))
}

async fn get_transfer(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<TransferRequest>, ApiError> {
    Ok(Json(service.get_transfer(id)?))
}

async fn transfers_by_year(
    State(service): State<Arc<EnrollmentService>>,
    Path(anio): Path<String>,
) -> Result<Json<Vec<TransferRequest>>, ApiError> {
    Ok(Json(service.transfers_by_year(&anio)?))
}

async fn transfers_by_dni(
    State(service): State<Arc<EnrollmentService>>,
    Query(query): Query<DniQuery>,
) -> Result<Json<DniEnvelope<TransferRequest>>, ApiError> {
    let dni = require_dni(query)?;
    Ok(Json(service.transfers_by_dni(&dni)?))
}

async fn create_transfer(
    State(service): State<Arc<EnrollmentService>>,
    Json(payload): Json<TransferRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let id = service.create_transfer(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "transfer request created successfully" })),
    ))
}

async fn update_transfer(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
    Json(payload): Json<TransferRequestPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.update_transfer(id, payload)?;
    Ok(Json(
        json!({ "message": "transfer request updated successfully" }),
    ))
}

async fn delete_transfer(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.delete_transfer(id)?;
    Ok(Json(
        json!({ "message": "transfer request deleted successfully" }),
    ))
}

// ---- promotion ----

async fn list_promotions(
    State(service): State<Arc<EnrollmentService>>,
) -> Result<Json<Vec<PromotionRequest>>, ApiError> {
    Ok(Json(service.list_promotions()?))
}

async fn get_promotion(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<PromotionRequest>, ApiError> {
    Ok(Json(service.get_promotion(id)?))
}

async fn promotions_by_current_year(
    State(service): State<Arc<EnrollmentService>>,
    Path(anio): Path<String>,
) -> Result<Json<Vec<PromotionRequest>>, ApiError> {
    Ok(Json(service.promotions_by_current_year(&anio)?))
}

async fn promotions_by_next_year(
    State(service): State<Arc<EnrollmentService>>,
    Path(anio): Path<String>,
) -> Result<Json<Vec<PromotionRequest>>, ApiError> {
    Ok(Json(service.promotions_by_next_year(&anio)?))
}

async fn promotions_by_student(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PromotionRequest>>, ApiError> {
    Ok(Json(service.promotions_by_student(id)?))
}

async fn promotions_by_dni(
    State(service): State<Arc<EnrollmentService>>,
    Query(query): Query<DniQuery>,
) -> Result<Json<DniEnvelope<PromotionRequest>>, ApiError> {
    let dni = require_dni(query)?;
    Ok(Json(service.promotions_by_dni(&dni)?))
}

async fn create_promotion(
    State(service): State<Arc<EnrollmentService>>,
    Json(payload): Json<PromotionRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let id = service.create_promotion(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "promotion request created successfully" })),
    ))
}

async fn update_promotion(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
    Json(payload): Json<PromotionRequestPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.update_promotion(id, payload)?;
    Ok(Json(
        json!({ "message": "promotion request updated successfully" }),
    ))
}

async fn delete_promotion(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service.delete_promotion(id)?;
    Ok(Json(
        json!({ "message": "promotion request deleted successfully" }),
    ))
}

// ---- unified view ----

async fn list_matriculas(
    State(service): State<Arc<EnrollmentService>>,
) -> Result<Json<Vec<RequestSummary>>, ApiError> {
    Ok(Json(service.all_summaries()?))
}

async fn get_matricula(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<RequestSummary>, ApiError> {
    Ok(Json(service.summary_by_id(id)?))
}

async fn matriculas_by_year(
    State(service): State<Arc<EnrollmentService>>,
    Path(anio): Path<String>,
) -> Result<Json<Vec<RequestSummary>>, ApiError> {
    Ok(Json(service.summaries_for_year(&anio)?))
}

async fn matriculas_by_student(
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<RequestSummary>>, ApiError> {
    Ok(Json(service.summaries_for_student(id)?))
}
