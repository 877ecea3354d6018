use std::sync::Arc;

use chrono::NaiveDate;

use crate::directory::students::{Sex, StudentStore, FIRST_GRADE};
use crate::error::ApiError;
use crate::validate;

use super::domain::{
    DniEnvelope, NewEnrollmentChanges, NewEnrollmentDraft, NewEnrollmentRequest, NewRequestPayload,
    PromotionChanges, PromotionDraft, PromotionRequest, PromotionRequestPayload, RequestStatus,
    TransferChanges, TransferDraft, TransferRequest, TransferRequestPayload,
};
use super::promotion;
use super::repository::{NewRequestStore, PromotionRequestStore, TransferRequestStore};

pub(super) const NEW_ENTITY: &str = "new enrollment request";
pub(super) const TRANSFER_ENTITY: &str = "transfer request";
pub(super) const PROMOTION_ENTITY: &str = "promotion request";

/// Service over the three request tables. Creation consults the student
/// directory and the eligibility engine where the variant demands it.
pub struct EnrollmentService {
    pub(super) new_requests: Arc<dyn NewRequestStore>,
    pub(super) transfers: Arc<dyn TransferRequestStore>,
    pub(super) promotions: Arc<dyn PromotionRequestStore>,
    pub(super) students: Arc<dyn StudentStore>,
}

fn parse_year_label(raw: &str) -> Result<String, ApiError> {
    if validate::is_year_label(raw) {
        Ok(raw.to_string())
    } else {
        Err(ApiError::Validation(
            "the school year must be 4 numeric digits".to_string(),
        ))
    }
}

fn parse_status(raw: Option<&str>) -> Result<RequestStatus, ApiError> {
    match raw {
        None => Ok(RequestStatus::Pending),
        Some(value) => RequestStatus::parse(value).ok_or_else(|| {
            ApiError::Validation(format!(
                "the status must be one of: {}",
                RequestStatus::ALLOWED
            ))
        }),
    }
}

fn parse_request_date(raw: &str) -> Result<NaiveDate, ApiError> {
    validate::parse_date(raw)
        .map_err(|_| ApiError::Validation("the date must be in YYYY-MM-DD format".to_string()))
}

fn parse_sex(raw: &str) -> Result<Sex, ApiError> {
    Sex::parse(raw).ok_or_else(|| ApiError::Validation("genero must be 'M' or 'F'".to_string()))
}

fn parse_grade(raw: i64) -> Result<u8, ApiError> {
    if !(FIRST_GRADE as i64..=promotion::FINAL_GRADE as i64).contains(&raw) {
        return Err(ApiError::Validation(format!(
            "the grade must be an integer between {} and {}",
            FIRST_GRADE,
            promotion::FINAL_GRADE
        )));
    }
    Ok(raw as u8)
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

/// Shared create validation for the two denormalized variants.
fn base_draft(
    payload: NewRequestPayload,
    required_message: &str,
) -> Result<NewEnrollmentDraft, ApiError> {
    let NewRequestPayload {
        nombre_estudiante,
        dni_estudiante,
        fecha_nacimiento,
        genero,
        grado_solicitado,
        direccion,
        nombre_apoderado,
        dni_apoderado,
        parentesco,
        ocupacion,
        grado_instruccion,
        telefono,
        email,
        direccion_apoderado,
        anio_escolar,
        fecha_solicitud,
        estado,
        comentarios,
    } = payload;

    let (
        nombre_estudiante,
        dni_estudiante,
        fecha_nacimiento,
        genero,
        grado_solicitado,
        direccion,
        nombre_apoderado,
        dni_apoderado,
        parentesco,
        ocupacion,
        grado_instruccion,
        telefono,
        direccion_apoderado,
        anio_escolar,
        fecha_solicitud,
    ) = match (
        nombre_estudiante,
        dni_estudiante,
        fecha_nacimiento,
        genero,
        grado_solicitado,
        direccion,
        nombre_apoderado,
        dni_apoderado,
        parentesco,
        ocupacion,
        grado_instruccion,
        telefono,
        direccion_apoderado,
        anio_escolar,
        fecha_solicitud,
    ) {
        (
            Some(a),
            Some(b),
            Some(c),
            Some(d),
            Some(e),
            Some(f),
            Some(g),
            Some(h),
            Some(i),
            Some(j),
            Some(k),
            Some(l),
            Some(m),
            Some(n),
            Some(o),
        ) => (a, b, c, d, e, f, g, h, i, j, k, l, m, n, o),
        _ => return Err(ApiError::Validation(required_message.to_string())),
    };

    let anio_escolar = parse_year_label(&anio_escolar)?;
    let estado = parse_status(estado.as_deref())?;
    let genero = parse_sex(&genero)?;
    let grado_solicitado = parse_grade(grado_solicitado)?;
    let fecha_nacimiento = parse_request_date(&fecha_nacimiento)?;
    let fecha_solicitud = parse_request_date(&fecha_solicitud)?;

    Ok(NewEnrollmentDraft {
        nombre_estudiante,
        dni_estudiante,
        fecha_nacimiento,
        genero,
        grado_solicitado,
        direccion,
        nombre_apoderado,
        dni_apoderado,
        parentesco,
        ocupacion,
        grado_instruccion,
        telefono,
        email,
        direccion_apoderado,
        anio_escolar,
        fecha_solicitud,
        estado,
        comentarios,
    })
}

/// Shared update validation for the two denormalized variants.
fn base_changes(payload: NewRequestPayload) -> Result<NewEnrollmentChanges, ApiError> {
    let mut changes = NewEnrollmentChanges::default();

    if let Some(raw) = payload.anio_escolar {
        changes.anio_escolar = Some(parse_year_label(&raw)?);
    }
    if let Some(raw) = payload.estado.as_deref() {
        changes.estado = Some(parse_status(Some(raw))?);
    }
    if let Some(raw) = payload.genero {
        changes.genero = Some(parse_sex(&raw)?);
    }
    if let Some(raw) = payload.grado_solicitado {
        changes.grado_solicitado = Some(parse_grade(raw)?);
    }
    if let Some(raw) = payload.fecha_nacimiento {
        changes.fecha_nacimiento = Some(parse_request_date(&raw)?);
    }
    if let Some(raw) = payload.fecha_solicitud {
        changes.fecha_solicitud = Some(parse_request_date(&raw)?);
    }
    changes.nombre_estudiante = payload.nombre_estudiante;
    changes.dni_estudiante = payload.dni_estudiante;
    changes.direccion = payload.direccion;
    changes.nombre_apoderado = payload.nombre_apoderado;
    changes.dni_apoderado = payload.dni_apoderado;
    changes.parentesco = payload.parentesco;
    changes.ocupacion = payload.ocupacion;
    changes.grado_instruccion = payload.grado_instruccion;
    changes.telefono = payload.telefono;
    changes.email = payload.email.map(Some);
    changes.direccion_apoderado = payload.direccion_apoderado;
    changes.comentarios = payload.comentarios.map(Some);

    Ok(changes)
}

impl EnrollmentService {
    pub fn new(
        new_requests: Arc<dyn NewRequestStore>,
        transfers: Arc<dyn TransferRequestStore>,
        promotions: Arc<dyn PromotionRequestStore>,
        students: Arc<dyn StudentStore>,
    ) -> Self {
        Self {
            new_requests,
            transfers,
            promotions,
            students,
        }
    }

    // ---- new enrollment ----

    pub fn list_new(&self) -> Result<Vec<NewEnrollmentRequest>, ApiError> {
        self.new_requests
            .list()
            .map_err(|err| err.for_entity(NEW_ENTITY, ""))
    }

    pub fn get_new(&self, id: i64) -> Result<NewEnrollmentRequest, ApiError> {
        self.new_requests
            .fetch(id)
            .map_err(|err| err.for_entity(NEW_ENTITY, ""))?
            .ok_or(ApiError::NotFound(NEW_ENTITY))
    }

    pub fn new_by_year(&self, anio: &str) -> Result<Vec<NewEnrollmentRequest>, ApiError> {
        let anio = parse_year_label(anio)?;
        self.new_requests
            .by_year(&anio)
            .map_err(|err| err.for_entity(NEW_ENTITY, ""))
    }

    pub fn create_new(&self, payload: NewRequestPayload) -> Result<i64, ApiError> {
        let draft = base_draft(
            payload,
            "all fields are required except email, estado and comentarios",
        )?;
        self.new_requests
            .insert(draft)
            .map_err(|err| err.for_entity(NEW_ENTITY, ""))
    }

    pub fn update_new(&self, id: i64, payload: NewRequestPayload) -> Result<(), ApiError> {
        let changes = base_changes(payload)?;
        if changes.is_empty() {
            return Err(ApiError::Validation("no fields to update".to_string()));
        }
        let affected = self
            .new_requests
            .update(id, &changes)
            .map_err(|err| err.for_entity(NEW_ENTITY, ""))?;
        if affected == 0 {
            return Err(ApiError::NotFound(NEW_ENTITY));
        }
        Ok(())
    }

    pub fn delete_new(&self, id: i64) -> Result<(), ApiError> {
        let affected = self
            .new_requests
            .delete(id)
            .map_err(|err| err.for_entity(NEW_ENTITY, ""))?;
        if affected == 0 {
            return Err(ApiError::NotFound(NEW_ENTITY));
        }
        Ok(())
    }

    pub fn new_by_dni(&self, dni: &str) -> Result<DniEnvelope<NewEnrollmentRequest>, ApiError> {
        validate_dni(dni)?;
        let mut rows = self
            .new_requests
            .by_student_dni(dni)
            .map_err(|err| err.for_entity(NEW_ENTITY, ""))?;
        rows.sort_by(|a, b| b.fecha_solicitud.cmp(&a.fecha_solicitud));
        self.envelope(dni, rows, |r| r.nombre_estudiante.clone(), NEW_ENTITY)
    }

    // ---- transfer ----

    pub fn list_transfers(&self) -> Result<Vec<TransferRequest>, ApiError> {
        self.transfers
            .list()
            .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))
    }

    pub fn get_transfer(&self, id: i64) -> Result<TransferRequest, ApiError> {
        self.transfers
            .fetch(id)
            .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))?
            .ok_or(ApiError::NotFound(TRANSFER_ENTITY))
    }

    pub fn transfers_by_year(&self, anio: &str) -> Result<Vec<TransferRequest>, ApiError> {
        let anio = parse_year_label(anio)?;
        self.transfers
            .by_year(&anio)
            .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))
    }

    pub fn create_transfer(&self, payload: TransferRequestPayload) -> Result<i64, ApiError> {
        const REQUIRED: &str =
            "all fields are required except email, motivo_traslado, estado and comentarios";
        let TransferRequestPayload {
            base,
            colegio_anterior,
            motivo_traslado,
        } = payload;
        let colegio_anterior =
            colegio_anterior.ok_or_else(|| ApiError::Validation(REQUIRED.to_string()))?;
        let base = base_draft(base, REQUIRED)?;
        self.transfers
            .insert(TransferDraft {
                base,
                colegio_anterior,
                motivo_traslado,
            })
            .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))
    }

    pub fn update_transfer(
        &self,
        id: i64,
        payload: TransferRequestPayload,
    ) -> Result<(), ApiError> {
        let changes = TransferChanges {
            base: base_changes(payload.base)?,
            colegio_anterior: payload.colegio_anterior,
            motivo_traslado: payload.motivo_traslado.map(Some),
        };
        if changes.is_empty() {
            return Err(ApiError::Validation("no fields to update".to_string()));
        }
        let affected = self
            .transfers
            .update(id, &changes)
            .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))?;
        if affected == 0 {
            return Err(ApiError::NotFound(TRANSFER_ENTITY));
        }
        Ok(())
    }

    pub fn delete_transfer(&self, id: i64) -> Result<(), ApiError> {
        let affected = self
            .transfers
            .delete(id)
            .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))?;
        if affected == 0 {
            return Err(ApiError::NotFound(TRANSFER_ENTITY));
        }
        Ok(())
    }

    pub fn transfers_by_dni(&self, dni: &str) -> Result<DniEnvelope<TransferRequest>, ApiError> {
        validate_dni(dni)?;
        let mut rows = self
            .transfers
            .by_student_dni(dni)
            .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))?;
        rows.sort_by(|a, b| b.fecha_solicitud.cmp(&a.fecha_solicitud));
        self.envelope(dni, rows, |r| r.nombre_estudiante.clone(), TRANSFER_ENTITY)
    }

    // ---- promotion ----

    pub fn list_promotions(&self) -> Result<Vec<PromotionRequest>, ApiError> {
        self.promotions
            .list()
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))
    }

    pub fn get_promotion(&self, id: i64) -> Result<PromotionRequest, ApiError> {
        self.promotions
            .fetch(id)
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))?
            .ok_or(ApiError::NotFound(PROMOTION_ENTITY))
    }

    pub fn promotions_by_current_year(
        &self,
        anio: &str,
    ) -> Result<Vec<PromotionRequest>, ApiError> {
        let anio = parse_year_label(anio)?;
        self.promotions
            .by_current_year(&anio)
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))
    }

    pub fn promotions_by_next_year(&self, anio: &str) -> Result<Vec<PromotionRequest>, ApiError> {
        let anio = parse_year_label(anio)?;
        self.promotions
            .by_next_year(&anio)
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))
    }

    pub fn promotions_by_student(
        &self,
        estudiante_id: i64,
    ) -> Result<Vec<PromotionRequest>, ApiError> {
        self.students
            .fetch(estudiante_id)
            .map_err(|err| err.for_entity("student", ""))?
            .ok_or(ApiError::NotFound("student"))?;
        self.promotions
            .by_student(estudiante_id)
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))
    }

    /// Promotion creation consults the directory and the eligibility
    /// engine; ineligible students are rejected with the engine's own
    /// message.
    pub fn create_promotion(&self, payload: PromotionRequestPayload) -> Result<i64, ApiError> {
        let mut missing = Vec::new();
        if payload.estudiante_id.is_none() {
            missing.push("estudiante_id");
        }
        if payload.grado_actual.is_none() {
            missing.push("grado_actual");
        }
        if payload.grado_siguiente.is_none() {
            missing.push("grado_siguiente");
        }
        if payload.anio_escolar_actual.is_none() {
            missing.push("anio_escolar_actual");
        }
        if payload.anio_escolar_siguiente.is_none() {
            missing.push("anio_escolar_siguiente");
        }
        if payload.fecha_solicitud.is_none() {
            missing.push("fecha_solicitud");
        }
        let (
            Some(estudiante_id),
            Some(grado_actual),
            Some(grado_siguiente),
            Some(anio_escolar_actual),
            Some(anio_escolar_siguiente),
            Some(fecha_solicitud),
        ) = (
            payload.estudiante_id,
            payload.grado_actual,
            payload.grado_siguiente,
            payload.anio_escolar_actual,
            payload.anio_escolar_siguiente,
            payload.fecha_solicitud,
        )
        else {
            return Err(ApiError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        };

        if !validate::is_year_label(&anio_escolar_actual)
            || !validate::is_year_label(&anio_escolar_siguiente)
        {
            return Err(ApiError::Validation(
                "school year labels must be 4 numeric digits".to_string(),
            ));
        }

        let grado_actual = parse_grade(grado_actual)?;
        let grado_siguiente = parse_grade(grado_siguiente)?;
        if grado_siguiente != promotion::next_grade(grado_actual) {
            return Err(ApiError::Validation(
                "grado_siguiente must be grado_actual plus one".to_string(),
            ));
        }

        let fecha_solicitud = parse_request_date(&fecha_solicitud)?;
        let estado = parse_status(payload.estado.as_deref())?;

        let student = self
            .students
            .fetch(estudiante_id)
            .map_err(|err| err.for_entity("student", ""))?
            .ok_or(ApiError::NotFound("student"))?;
        let decision = promotion::evaluate(student.estado, student.grado_actual);
        if !decision.puede_promocionar {
            return Err(ApiError::Validation(decision.mensaje.to_string()));
        }

        self.promotions
            .insert(PromotionDraft {
                estudiante_id,
                grado_actual,
                grado_siguiente,
                anio_escolar_actual,
                anio_escolar_siguiente,
                fecha_solicitud,
                estado,
                comentarios: payload.comentarios,
            })
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))
    }

    pub fn update_promotion(
        &self,
        id: i64,
        payload: PromotionRequestPayload,
    ) -> Result<(), ApiError> {
        let mut changes = PromotionChanges::default();

        if let Some(raw) = payload.anio_escolar_actual {
            changes.anio_escolar_actual = Some(parse_year_label(&raw)?);
        }
        if let Some(raw) = payload.anio_escolar_siguiente {
            changes.anio_escolar_siguiente = Some(parse_year_label(&raw)?);
        }
        if let Some(estudiante_id) = payload.estudiante_id {
            self.students
                .fetch(estudiante_id)
                .map_err(|err| err.for_entity("student", ""))?
                .ok_or(ApiError::NotFound("student"))?;
            changes.estudiante_id = Some(estudiante_id);
        }
        if let Some(raw) = payload.grado_actual {
            changes.grado_actual = Some(parse_grade(raw)?);
        }
        if let Some(raw) = payload.grado_siguiente {
            changes.grado_siguiente = Some(parse_grade(raw)?);
        }
        if let Some(raw) = payload.fecha_solicitud {
            changes.fecha_solicitud = Some(parse_request_date(&raw)?);
        }
        if let Some(raw) = payload.estado.as_deref() {
            changes.estado = Some(parse_status(Some(raw))?);
        }
        changes.comentarios = payload.comentarios.map(Some);

        if changes.is_empty() {
            return Err(ApiError::Validation("no fields to update".to_string()));
        }
        let affected = self
            .promotions
            .update(id, &changes)
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))?;
        if affected == 0 {
            return Err(ApiError::NotFound(PROMOTION_ENTITY));
        }
        Ok(())
    }

    pub fn delete_promotion(&self, id: i64) -> Result<(), ApiError> {
        let affected = self
            .promotions
            .delete(id)
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))?;
        if affected == 0 {
            return Err(ApiError::NotFound(PROMOTION_ENTITY));
        }
        Ok(())
    }

    pub fn promotions_by_dni(&self, dni: &str) -> Result<DniEnvelope<PromotionRequest>, ApiError> {
        validate_dni(dni)?;
        let student = self
            .students
            .fetch_by_dni(dni)
            .map_err(|err| err.for_entity("student", ""))?;

        let mut rows = match &student {
            Some(student) => self
                .promotions
                .by_student(student.id)
                .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))?,
            None => Vec::new(),
        };
        rows.sort_by(|a, b| b.fecha_solicitud.cmp(&a.fecha_solicitud));

        let mensaje = match (&student, rows.is_empty()) {
            (Some(_), true) => Some(format!(
                "the student exists in the system but has no {PROMOTION_ENTITY}s registered"
            )),
            _ => None,
        };

        Ok(DniEnvelope {
            success: true,
            dni_estudiante: dni.to_string(),
            nombre_estudiante: student.map(|s| s.nombre),
            total_solicitudes: rows.len(),
            solicitudes: rows,
            mensaje,
        })
    }

    /// Envelope builder for the denormalized variants: when the student
    /// has no requests, the directory is consulted so the caller can
    /// tell "unknown student" from "no requests yet".
    fn envelope<T: serde::Serialize>(
        &self,
        dni: &str,
        rows: Vec<T>,
        name_of: impl Fn(&T) -> String,
        entity: &str,
    ) -> Result<DniEnvelope<T>, ApiError> {
        if rows.is_empty() {
            let student = self
                .students
                .fetch_by_dni(dni)
                .map_err(|err| err.for_entity("student", ""))?;
            return Ok(DniEnvelope {
                success: true,
                dni_estudiante: dni.to_string(),
                nombre_estudiante: student.as_ref().map(|s| s.nombre.clone()),
                total_solicitudes: 0,
                solicitudes: Vec::new(),
                mensaje: student.map(|_| {
                    format!("the student exists in the system but has no {entity}s registered")
                }),
            });
        }

        Ok(DniEnvelope {
            success: true,
            dni_estudiante: dni.to_string(),
            nombre_estudiante: rows.first().map(&name_of),
            total_solicitudes: rows.len(),
            solicitudes: rows,
            mensaje: None,
        })
    }
}
