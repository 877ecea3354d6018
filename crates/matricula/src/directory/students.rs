use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::enrollment::promotion::{self, PromotionDecision};
use crate::error::ApiError;
use crate::store::StoreError;
use crate::validate;

pub const FIRST_GRADE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentStatus {
    #[serde(rename = "activo")]
    Active,
    #[serde(rename = "inactivo")]
    Inactive,
}

impl StudentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "activo" => Some(Self::Active),
            "inactivo" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "activo",
            Self::Inactive => "inactivo",
        }
    }
}

/// A student as stored in the directory. Wire keys keep the original
/// API contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub nombre: String,
    pub dni: String,
    pub fecha_nacimiento: NaiveDate,
    pub genero: Sex,
    pub grado_actual: u8,
    pub direccion: String,
    pub estado: StudentStatus,
    pub fecha_ingreso: NaiveDate,
}

/// Validated data for a directory insert; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewStudentRecord {
    pub nombre: String,
    pub dni: String,
    pub fecha_nacimiento: NaiveDate,
    pub genero: Sex,
    pub grado_actual: u8,
    pub direccion: String,
    pub estado: StudentStatus,
    pub fecha_ingreso: NaiveDate,
}

/// Validated partial update. Empty means the caller sent nothing usable.
#[derive(Debug, Clone, Default)]
pub struct StudentChanges {
    pub nombre: Option<String>,
    pub dni: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub genero: Option<Sex>,
    pub grado_actual: Option<u8>,
    pub direccion: Option<String>,
    pub estado: Option<StudentStatus>,
}

impl StudentChanges {
    pub fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.dni.is_none()
            && self.fecha_nacimiento.is_none()
            && self.genero.is_none()
            && self.grado_actual.is_none()
            && self.direccion.is_none()
            && self.estado.is_none()
    }
}

/// Raw request body for create/update; everything optional so the
/// service can produce the contract's error messages itself.
#[derive(Debug, Default, Deserialize)]
pub struct StudentPayload {
    pub nombre: Option<String>,
    pub dni: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub genero: Option<String>,
    pub grado: Option<i64>,
    pub direccion: Option<String>,
    pub estado: Option<String>,
}

/// Storage abstraction over the students table.
pub trait StudentStore: Send + Sync {
    fn insert(&self, record: NewStudentRecord) -> Result<Student, StoreError>;
    fn fetch(&self, id: i64) -> Result<Option<Student>, StoreError>;
    fn fetch_by_dni(&self, dni: &str) -> Result<Option<Student>, StoreError>;
    fn list(&self) -> Result<Vec<Student>, StoreError>;
    fn update(&self, id: i64, changes: &StudentChanges) -> Result<usize, StoreError>;
    fn delete(&self, id: i64) -> Result<usize, StoreError>;
}

const DELETE_RESTRICTED: &str =
    "the student cannot be deleted because related records exist (enrollment requests or guardian links)";

fn validate_grade(grado: i64) -> Result<u8, ApiError> {
    if !(FIRST_GRADE as i64..=promotion::FINAL_GRADE as i64).contains(&grado) {
        return Err(ApiError::Validation(format!(
            "grado must be an integer between {} and {}",
            FIRST_GRADE,
            promotion::FINAL_GRADE
        )));
    }
    Ok(grado as u8)
}

fn validate_dni(dni: &str) -> Result<(), ApiError> {
    if validate::is_dni(dni) {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "dni must be 8 numeric digits".to_string(),
        ))
    }
}

/// Service over the students table: CRUD plus the promotion check.
pub struct StudentDirectory {
    store: Arc<dyn StudentStore>,
}

impl StudentDirectory {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn StudentStore> {
        self.store.clone()
    }

    pub fn list(&self) -> Result<Vec<Student>, ApiError> {
        self.store
            .list()
            .map_err(|err| err.for_entity("student", DELETE_RESTRICTED))
    }

    pub fn get(&self, id: i64) -> Result<Student, ApiError> {
        self.store
            .fetch(id)
            .map_err(|err| err.for_entity("student", DELETE_RESTRICTED))?
            .ok_or(ApiError::NotFound("student"))
    }

    pub fn create(&self, payload: StudentPayload) -> Result<Student, ApiError> {
        let (nombre, dni, fecha_nacimiento, genero, grado, direccion) = match (
            payload.nombre,
            payload.dni,
            payload.fecha_nacimiento,
            payload.genero,
            payload.grado,
            payload.direccion,
        ) {
            (Some(n), Some(d), Some(f), Some(g), Some(gr), Some(dir)) => (n, d, f, g, gr, dir),
            _ => {
                return Err(ApiError::Validation(
                    "all fields are required: nombre, dni, fecha_nacimiento, genero, grado, direccion"
                        .to_string(),
                ))
            }
        };

        validate_dni(&dni)?;
        let genero = Sex::parse(&genero)
            .ok_or_else(|| ApiError::Validation("genero must be 'M' or 'F'".to_string()))?;
        let grado_actual = validate_grade(grado)?;
        let fecha_nacimiento =
            validate::parse_date(&fecha_nacimiento).map_err(ApiError::Validation)?;
        let estado = match payload.estado.as_deref() {
            None => StudentStatus::Active,
            Some(raw) => StudentStatus::parse(raw).ok_or_else(|| {
                ApiError::Validation("estado must be 'activo' or 'inactivo'".to_string())
            })?,
        };

        self.store
            .insert(NewStudentRecord {
                nombre,
                dni,
                fecha_nacimiento,
                genero,
                grado_actual,
                direccion,
                estado,
                fecha_ingreso: Local::now().date_naive(),
            })
            .map_err(|err| err.for_entity("student", DELETE_RESTRICTED))
    }

    pub fn update(&self, id: i64, payload: StudentPayload) -> Result<(), ApiError> {
        let mut changes = StudentChanges::default();

        if let Some(dni) = payload.dni {
            validate_dni(&dni)?;
            changes.dni = Some(dni);
        }
        if let Some(genero) = payload.genero {
            changes.genero = Some(Sex::parse(&genero).ok_or_else(|| {
                ApiError::Validation("genero must be 'M' or 'F'".to_string())
            })?);
        }
        if let Some(grado) = payload.grado {
            changes.grado_actual = Some(validate_grade(grado)?);
        }
        if let Some(raw) = payload.fecha_nacimiento {
            changes.fecha_nacimiento =
                Some(validate::parse_date(&raw).map_err(ApiError::Validation)?);
        }
        if let Some(raw) = payload.estado {
            changes.estado = Some(StudentStatus::parse(&raw).ok_or_else(|| {
                ApiError::Validation("estado must be 'activo' or 'inactivo'".to_string())
            })?);
        }
        changes.nombre = payload.nombre;
        changes.direccion = payload.direccion;

        if changes.is_empty() {
            return Err(ApiError::Validation("no fields to update".to_string()));
        }

        let affected = self
            .store
            .update(id, &changes)
            .map_err(|err| err.for_entity("student", DELETE_RESTRICTED))?;
        if affected == 0 {
            return Err(ApiError::NotFound("student"));
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<(), ApiError> {
        let affected = self
            .store
            .delete(id)
            .map_err(|err| err.for_entity("student", DELETE_RESTRICTED))?;
        if affected == 0 {
            return Err(ApiError::NotFound("student"));
        }
        Ok(())
    }

    /// Promotion check keyed by national id. Pure over the fetched row.
    pub fn check_promotion(&self, dni: &str) -> Result<(Student, PromotionDecision), ApiError> {
        validate_dni(dni)?;
        let student = self
            .store
            .fetch_by_dni(dni)
            .map_err(|err| err.for_entity("student", DELETE_RESTRICTED))?
            .ok_or(ApiError::NotFound("student"))?;
        let decision = promotion::evaluate(student.estado, student.grado_actual);
        Ok((student, decision))
    }
}

#[derive(Debug, Deserialize)]
pub struct DniQuery {
    pub dni: Option<String>,
}

pub fn student_router(directory: Arc<StudentDirectory>) -> Router {
    Router::new()
        .route(
            "/api/estudiantes",
            get(list_students).post(create_student),
        )
        .route(
            "/api/estudiantes/verificar-promocion",
            get(check_promotion),
        )
        .route(
            "/api/estudiantes/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
        .with_state(directory)
}

async fn list_students(
    State(directory): State<Arc<StudentDirectory>>,
) -> Result<Json<Vec<Student>>, ApiError> {
    Ok(Json(directory.list()?))
}

async fn get_student(
    State(directory): State<Arc<StudentDirectory>>,
    Path(id): Path<i64>,
) -> Result<Json<Student>, ApiError> {
    Ok(Json(directory.get(id)?))
}

async fn create_student(
    State(directory): State<Arc<StudentDirectory>>,
    Json(payload): Json<StudentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let student = directory.create(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": student.id, "message": "student created successfully" })),
    ))
}

async fn update_student(
    State(directory): State<Arc<StudentDirectory>>,
    Path(id): Path<i64>,
    Json(payload): Json<StudentPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    directory.update(id, payload)?;
    Ok(Json(json!({ "message": "student updated successfully" })))
}

async fn delete_student(
    State(directory): State<Arc<StudentDirectory>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    directory.delete(id)?;
    Ok(Json(json!({ "message": "student deleted successfully" })))
}

async fn check_promotion(
    State(directory): State<Arc<StudentDirectory>>,
    Query(query): Query<DniQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let dni = query
        .dni
        .ok_or_else(|| ApiError::Validation("the student dni is required".to_string()))?;
    let (student, decision) = directory.check_promotion(&dni)?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "estudiante": student,
            "promocion": decision,
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MemoryStudents {
        rows: Mutex<HashMap<i64, Student>>,
        next_id: Mutex<i64>,
    }

    impl StudentStore for MemoryStudents {
        fn insert(&self, record: NewStudentRecord) -> Result<Student, StoreError> {
            let mut rows = self.rows.lock().expect("store mutex poisoned");
            if rows.values().any(|s| s.dni == record.dni) {
                return Err(StoreError::Conflict {
                    field: "dni".to_string(),
                });
            }
            let mut next = self.next_id.lock().expect("id mutex poisoned");
            *next += 1;
            let student = Student {
                id: *next,
                nombre: record.nombre,
                dni: record.dni,
                fecha_nacimiento: record.fecha_nacimiento,
                genero: record.genero,
                grado_actual: record.grado_actual,
                direccion: record.direccion,
                estado: record.estado,
                fecha_ingreso: record.fecha_ingreso,
            };
            rows.insert(student.id, student.clone());
            Ok(student)
        }

        fn fetch(&self, id: i64) -> Result<Option<Student>, StoreError> {
            Ok(self
                .rows
                .lock()
                .expect("store mutex poisoned")
                .get(&id)
                .cloned())
        }

        fn fetch_by_dni(&self, dni: &str) -> Result<Option<Student>, StoreError> {
            Ok(self
                .rows
                .lock()
                .expect("store mutex poisoned")
                .values()
                .find(|s| s.dni == dni)
                .cloned())
        }

        fn list(&self) -> Result<Vec<Student>, StoreError> {
            let mut all: Vec<Student> = self
                .rows
                .lock()
                .expect("store mutex poisoned")
                .values()
                .cloned()
                .collect();
            all.sort_by_key(|s| s.id);
            Ok(all)
        }

        fn update(&self, id: i64, changes: &StudentChanges) -> Result<usize, StoreError> {
            let mut rows = self.rows.lock().expect("store mutex poisoned");
            match rows.get_mut(&id) {
                None => Ok(0),
                Some(student) => {
                    if let Some(v) = &changes.nombre {
                        student.nombre = v.clone();
                    }
                    if let Some(v) = &changes.dni {
                        student.dni = v.clone();
                    }
                    if let Some(v) = changes.fecha_nacimiento {
                        student.fecha_nacimiento = v;
                    }
                    if let Some(v) = changes.genero {
                        student.genero = v;
                    }
                    if let Some(v) = changes.grado_actual {
                        student.grado_actual = v;
                    }
                    if let Some(v) = &changes.direccion {
                        student.direccion = v.clone();
                    }
                    if let Some(v) = changes.estado {
                        student.estado = v;
                    }
                    Ok(1)
                }
            }
        }

        fn delete(&self, id: i64) -> Result<usize, StoreError> {
            Ok(self
                .rows
                .lock()
                .expect("store mutex poisoned")
                .remove(&id)
                .map(|_| 1)
                .unwrap_or(0))
        }
    }

    fn directory() -> StudentDirectory {
        StudentDirectory::new(Arc::new(MemoryStudents::default()))
    }

    fn payload() -> StudentPayload {
        StudentPayload {
            nombre: Some("Lucía Fernández".to_string()),
            dni: Some("12345678".to_string()),
            fecha_nacimiento: Some("2015-03-12".to_string()),
            genero: Some("F".to_string()),
            grado: Some(3),
            direccion: Some("Av. Los Álamos 120".to_string()),
            estado: None,
        }
    }

    #[test]
    fn create_then_get_round_trips_the_dni() {
        let directory = directory();
        let created = directory.create(payload()).expect("student created");
        let fetched = directory.get(created.id).expect("student fetched");
        assert_eq!(fetched.dni, "12345678");
        assert_eq!(fetched.estado, StudentStatus::Active);
        assert_eq!(fetched.grado_actual, 3);
    }

    #[test]
    fn create_rejects_malformed_dni() {
        let directory = directory();
        let mut bad = payload();
        bad.dni = Some("1234".to_string());
        match directory.create(bad) {
            Err(ApiError::Validation(msg)) => assert!(msg.contains("8 numeric digits")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_missing_fields() {
        let directory = directory();
        let mut bad = payload();
        bad.direccion = None;
        assert!(matches!(
            directory.create(bad),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn create_rejects_out_of_range_grade() {
        let directory = directory();
        let mut bad = payload();
        bad.grado = Some(7);
        match directory.create(bad) {
            Err(ApiError::Validation(msg)) => assert!(msg.contains("between 1 and 6")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_dni_surfaces_as_domain_conflict() {
        let directory = directory();
        directory.create(payload()).expect("first insert");
        match directory.create(payload()) {
            Err(ApiError::Conflict(msg)) => {
                assert_eq!(msg, "a student with this dni already exists")
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn update_requires_at_least_one_field() {
        let directory = directory();
        let created = directory.create(payload()).expect("student created");
        match directory.update(created.id, StudentPayload::default()) {
            Err(ApiError::Validation(msg)) => assert_eq!(msg, "no fields to update"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn update_of_unknown_id_is_not_found() {
        let directory = directory();
        let mut changes = StudentPayload::default();
        changes.nombre = Some("Otro".to_string());
        assert!(matches!(
            directory.update(999, changes),
            Err(ApiError::NotFound("student"))
        ));
    }

    #[test]
    fn promotion_check_uses_directory_state() {
        let directory = directory();
        directory.create(payload()).expect("student created");
        let (student, decision) = directory
            .check_promotion("12345678")
            .expect("promotion check runs");
        assert!(decision.puede_promocionar);
        assert_eq!(decision.grado_siguiente, student.grado_actual + 1);
    }

    #[test]
    fn promotion_check_rejects_bad_dni_before_lookup() {
        let directory = directory();
        assert!(matches!(
            directory.check_promotion("12"),
            Err(ApiError::Validation(_))
        ));
    }
}
