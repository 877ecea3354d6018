//! The unified matriculas view.
//!
//! There is no materialized table behind it: every read fans out over
//! the three variant tables, tags each row with its source, and
//! merge-sorts by request date descending.

use crate::error::ApiError;
use crate::validate;

use super::domain::{
    EnrollmentRequest, NewEnrollmentRequest, PromotionRequest, RequestKind, RequestSummary,
    TransferRequest,
};
use super::service::{EnrollmentService, NEW_ENTITY, PROMOTION_ENTITY, TRANSFER_ENTITY};

fn summarize_new(request: NewEnrollmentRequest) -> RequestSummary {
    RequestSummary {
        id: request.id,
        tipo_matricula: RequestKind::New,
        estudiante_nombre: request.nombre_estudiante,
        dni_estudiante: request.dni_estudiante,
        grado_solicitado: request.grado_solicitado,
        anio_escolar: request.anio_escolar,
        fecha_solicitud: request.fecha_solicitud,
        estado: request.estado,
        colegio_anterior: None,
    }
}

fn summarize_transfer(request: TransferRequest) -> RequestSummary {
    RequestSummary {
        id: request.id,
        tipo_matricula: RequestKind::Transfer,
        estudiante_nombre: request.nombre_estudiante,
        dni_estudiante: request.dni_estudiante,
        grado_solicitado: request.grado_solicitado,
        anio_escolar: request.anio_escolar,
        fecha_solicitud: request.fecha_solicitud,
        estado: request.estado,
        colegio_anterior: Some(request.colegio_anterior),
    }
}

fn merge_desc(mut rows: Vec<RequestSummary>) -> Vec<RequestSummary> {
    rows.sort_by(|a, b| b.fecha_solicitud.cmp(&a.fecha_solicitud));
    rows
}

impl EnrollmentService {
    /// The promotion table carries no student bio data; the view joins
    /// it against the directory, while the other two variants read
    /// their own denormalized columns.
    fn summarize_promotion(&self, request: PromotionRequest) -> Result<RequestSummary, ApiError> {
        let student = self
            .students
            .fetch(request.estudiante_id)
            .map_err(|err| err.for_entity("student", ""))?;
        let (nombre, dni) = match student {
            Some(student) => (student.nombre, student.dni),
            // Dangling FK; surface the row anyway rather than hide it.
            None => (String::new(), String::new()),
        };
        Ok(RequestSummary {
            id: request.id,
            tipo_matricula: RequestKind::Promotion,
            estudiante_nombre: nombre,
            dni_estudiante: dni,
            grado_solicitado: request.grado_siguiente,
            anio_escolar: request.anio_escolar_siguiente,
            fecha_solicitud: request.fecha_solicitud,
            estado: request.estado,
            colegio_anterior: None,
        })
    }

    /// Every matricula across the three tables, newest first.
    pub fn all_summaries(&self) -> Result<Vec<RequestSummary>, ApiError> {
        let mut rows: Vec<RequestSummary> = Vec::new();
        rows.extend(self.list_new()?.into_iter().map(summarize_new));
        rows.extend(self.list_transfers()?.into_iter().map(summarize_transfer));
        for request in self.list_promotions()? {
            rows.push(self.summarize_promotion(request)?);
        }
        Ok(merge_desc(rows))
    }

    /// Probe the variant tables in order until one of them owns the id.
    pub fn summary_by_id(&self, id: i64) -> Result<RequestSummary, ApiError> {
        if let Some(request) = self
            .new_requests
            .fetch(id)
            .map_err(|err| err.for_entity(NEW_ENTITY, ""))?
        {
            return Ok(summarize_new(request));
        }
        if let Some(request) = self
            .transfers
            .fetch(id)
            .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))?
        {
            return Ok(summarize_transfer(request));
        }
        if let Some(request) = self
            .promotions
            .fetch(id)
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))?
        {
            return self.summarize_promotion(request);
        }
        Err(ApiError::NotFound("matricula"))
    }

    /// Requests belonging to one student. The join strategy is
    /// asymmetric on purpose: denormalized DNI match for New/Transfer,
    /// the student FK for Promotion.
    pub fn summaries_for_student(&self, estudiante_id: i64) -> Result<Vec<RequestSummary>, ApiError> {
        let student = self
            .students
            .fetch(estudiante_id)
            .map_err(|err| err.for_entity("student", ""))?
            .ok_or(ApiError::NotFound("student"))?;

        let mut rows: Vec<RequestSummary> = Vec::new();
        rows.extend(
            self.new_requests
                .by_student_dni(&student.dni)
                .map_err(|err| err.for_entity(NEW_ENTITY, ""))?
                .into_iter()
                .map(summarize_new),
        );
        rows.extend(
            self.transfers
                .by_student_dni(&student.dni)
                .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))?
                .into_iter()
                .map(summarize_transfer),
        );
        for request in self
            .promotions
            .by_student(estudiante_id)
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))?
        {
            rows.push(self.summarize_promotion(request)?);
        }
        Ok(merge_desc(rows))
    }

    /// Requests for a school year. Promotions count toward the year
    /// being entered, not the one being left.
    pub fn summaries_for_year(&self, anio: &str) -> Result<Vec<RequestSummary>, ApiError> {
        if !validate::is_year_label(anio) {
            return Err(ApiError::Validation(
                "the school year must be 4 numeric digits".to_string(),
            ));
        }

        let mut rows: Vec<RequestSummary> = Vec::new();
        rows.extend(
            self.new_requests
                .by_year(anio)
                .map_err(|err| err.for_entity(NEW_ENTITY, ""))?
                .into_iter()
                .map(summarize_new),
        );
        rows.extend(
            self.transfers
                .by_year(anio)
                .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))?
                .into_iter()
                .map(summarize_transfer),
        );
        for request in self
            .promotions
            .by_next_year(anio)
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))?
        {
            rows.push(self.summarize_promotion(request)?);
        }
        Ok(merge_desc(rows))
    }

    /// The tagged union of one row, for callers that need the full
    /// variant payload rather than the summary projection.
    pub fn find_request(&self, id: i64) -> Result<EnrollmentRequest, ApiError> {
        if let Some(request) = self
            .new_requests
            .fetch(id)
            .map_err(|err| err.for_entity(NEW_ENTITY, ""))?
        {
            return Ok(EnrollmentRequest::New(request));
        }
        if let Some(request) = self
            .transfers
            .fetch(id)
            .map_err(|err| err.for_entity(TRANSFER_ENTITY, ""))?
        {
            return Ok(EnrollmentRequest::Transfer(request));
        }
        if let Some(request) = self
            .promotions
            .fetch(id)
            .map_err(|err| err.for_entity(PROMOTION_ENTITY, ""))?
        {
            return Ok(EnrollmentRequest::Promotion(request));
        }
        Err(ApiError::NotFound("matricula"))
    }
}
