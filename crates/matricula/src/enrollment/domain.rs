use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::directory::students::Sex;

/// Flat status field on every request row. Transitions are not guarded;
/// any value may be written at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "aprobada")]
    Approved,
    #[serde(rename = "rechazada")]
    Rejected,
}

impl RequestStatus {
    pub const ALLOWED: &'static str = "pendiente, aprobada, rechazada";

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pendiente" => Some(Self::Pending),
            "aprobada" => Some(Self::Approved),
            "rechazada" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pendiente",
            Self::Approved => "aprobada",
            Self::Rejected => "rechazada",
        }
    }
}

/// Which of the three physical request tables a row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    #[serde(rename = "nueva")]
    New,
    #[serde(rename = "traslado")]
    Transfer,
    #[serde(rename = "siguiente")]
    Promotion,
}

impl RequestKind {
    pub const ALLOWED: &'static str = "nueva, traslado, siguiente";

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "nueva" => Some(Self::New),
            "traslado" => Some(Self::Transfer),
            "siguiente" => Some(Self::Promotion),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "nueva",
            Self::Transfer => "traslado",
            Self::Promotion => "siguiente",
        }
    }
}

/// Lookup key into the request tables. This is a weak reference: the
/// attachment and observation stores keep it without any foreign key,
/// because it spans three unrelated tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRef {
    pub kind: RequestKind,
    pub id: i64,
}

/// A new-enrollment request row. Student and guardian data is
/// denormalized on purpose: applicants are usually not in the
/// directories yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEnrollmentRequest {
    pub id: i64,
    pub nombre_estudiante: String,
    pub dni_estudiante: String,
    pub fecha_nacimiento: NaiveDate,
    pub genero: Sex,
    pub grado_solicitado: u8,
    pub direccion: String,
    pub nombre_apoderado: String,
    pub dni_apoderado: String,
    pub parentesco: String,
    pub ocupacion: String,
    pub grado_instruccion: String,
    pub telefono: String,
    pub email: Option<String>,
    pub direccion_apoderado: String,
    pub anio_escolar: String,
    pub fecha_solicitud: NaiveDate,
    pub estado: RequestStatus,
    pub comentarios: Option<String>,
}

/// A transfer request row: the new-enrollment fields plus the prior
/// school and the transfer reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub id: i64,
    pub nombre_estudiante: String,
    pub dni_estudiante: String,
    pub fecha_nacimiento: NaiveDate,
    pub genero: Sex,
    pub grado_solicitado: u8,
    pub direccion: String,
    pub nombre_apoderado: String,
    pub dni_apoderado: String,
    pub parentesco: String,
    pub ocupacion: String,
    pub grado_instruccion: String,
    pub telefono: String,
    pub email: Option<String>,
    pub direccion_apoderado: String,
    pub colegio_anterior: String,
    pub motivo_traslado: Option<String>,
    pub anio_escolar: String,
    pub fecha_solicitud: NaiveDate,
    pub estado: RequestStatus,
    pub comentarios: Option<String>,
}

/// A grade-promotion request row. Unlike the other two variants it
/// references the student directory directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRequest {
    pub id: i64,
    pub estudiante_id: i64,
    pub grado_actual: u8,
    pub grado_siguiente: u8,
    pub anio_escolar_actual: String,
    pub anio_escolar_siguiente: String,
    pub fecha_solicitud: NaiveDate,
    pub estado: RequestStatus,
    pub comentarios: Option<String>,
}

/// The three variants unified at the service layer only; there is no
/// physical table behind this type.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollmentRequest {
    New(NewEnrollmentRequest),
    Transfer(TransferRequest),
    Promotion(PromotionRequest),
}

impl EnrollmentRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::New(_) => RequestKind::New,
            Self::Transfer(_) => RequestKind::Transfer,
            Self::Promotion(_) => RequestKind::Promotion,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::New(r) => r.id,
            Self::Transfer(r) => r.id,
            Self::Promotion(r) => r.id,
        }
    }

    pub fn request_date(&self) -> NaiveDate {
        match self {
            Self::New(r) => r.fecha_solicitud,
            Self::Transfer(r) => r.fecha_solicitud,
            Self::Promotion(r) => r.fecha_solicitud,
        }
    }
}

/// One row of the unified matriculas view: the shared columns of the
/// three variants, tagged with the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub id: i64,
    pub tipo_matricula: RequestKind,
    pub estudiante_nombre: String,
    pub dni_estudiante: String,
    pub grado_solicitado: u8,
    pub anio_escolar: String,
    pub fecha_solicitud: NaiveDate,
    pub estado: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colegio_anterior: Option<String>,
}

// ---- validated insert data (the stores assign the ids) ----

#[derive(Debug, Clone)]
pub struct NewEnrollmentDraft {
    pub nombre_estudiante: String,
    pub dni_estudiante: String,
    pub fecha_nacimiento: NaiveDate,
    pub genero: Sex,
    pub grado_solicitado: u8,
    pub direccion: String,
    pub nombre_apoderado: String,
    pub dni_apoderado: String,
    pub parentesco: String,
    pub ocupacion: String,
    pub grado_instruccion: String,
    pub telefono: String,
    pub email: Option<String>,
    pub direccion_apoderado: String,
    pub anio_escolar: String,
    pub fecha_solicitud: NaiveDate,
    pub estado: RequestStatus,
    pub comentarios: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransferDraft {
    pub base: NewEnrollmentDraft,
    pub colegio_anterior: String,
    pub motivo_traslado: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PromotionDraft {
    pub estudiante_id: i64,
    pub grado_actual: u8,
    pub grado_siguiente: u8,
    pub anio_escolar_actual: String,
    pub anio_escolar_siguiente: String,
    pub fecha_solicitud: NaiveDate,
    pub estado: RequestStatus,
    pub comentarios: Option<String>,
}

// ---- validated partial updates ----

#[derive(Debug, Clone, Default)]
pub struct NewEnrollmentChanges {
    pub nombre_estudiante: Option<String>,
    pub dni_estudiante: Option<String>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub genero: Option<Sex>,
    pub grado_solicitado: Option<u8>,
    pub direccion: Option<String>,
    pub nombre_apoderado: Option<String>,
    pub dni_apoderado: Option<String>,
    pub parentesco: Option<String>,
    pub ocupacion: Option<String>,
    pub grado_instruccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<Option<String>>,
    pub direccion_apoderado: Option<String>,
    pub anio_escolar: Option<String>,
    pub fecha_solicitud: Option<NaiveDate>,
    pub estado: Option<RequestStatus>,
    pub comentarios: Option<Option<String>>,
}

impl NewEnrollmentChanges {
    pub fn is_empty(&self) -> bool {
        self.nombre_estudiante.is_none()
            && self.dni_estudiante.is_none()
            && self.fecha_nacimiento.is_none()
            && self.genero.is_none()
            && self.grado_solicitado.is_none()
            && self.direccion.is_none()
            && self.nombre_apoderado.is_none()
            && self.dni_apoderado.is_none()
            && self.parentesco.is_none()
            && self.ocupacion.is_none()
            && self.grado_instruccion.is_none()
            && self.telefono.is_none()
            && self.email.is_none()
            && self.direccion_apoderado.is_none()
            && self.anio_escolar.is_none()
            && self.fecha_solicitud.is_none()
            && self.estado.is_none()
            && self.comentarios.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransferChanges {
    pub base: NewEnrollmentChanges,
    pub colegio_anterior: Option<String>,
    pub motivo_traslado: Option<Option<String>>,
}

impl TransferChanges {
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.colegio_anterior.is_none() && self.motivo_traslado.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromotionChanges {
    pub estudiante_id: Option<i64>,
    pub grado_actual: Option<u8>,
    pub grado_siguiente: Option<u8>,
    pub anio_escolar_actual: Option<String>,
    pub anio_escolar_siguiente: Option<String>,
    pub fecha_solicitud: Option<NaiveDate>,
    pub estado: Option<RequestStatus>,
    pub comentarios: Option<Option<String>>,
}

impl PromotionChanges {
    pub fn is_empty(&self) -> bool {
        self.estudiante_id.is_none()
            && self.grado_actual.is_none()
            && self.grado_siguiente.is_none()
            && self.anio_escolar_actual.is_none()
            && self.anio_escolar_siguiente.is_none()
            && self.fecha_solicitud.is_none()
            && self.estado.is_none()
            && self.comentarios.is_none()
    }
}

// ---- raw request bodies ----

/// Body for new-enrollment create/update. Everything optional so the
/// service owns the required-field messages.
#[derive(Debug, Default, Deserialize)]
pub struct NewRequestPayload {
    pub nombre_estudiante: Option<String>,
    pub dni_estudiante: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub genero: Option<String>,
    pub grado_solicitado: Option<i64>,
    pub direccion: Option<String>,
    pub nombre_apoderado: Option<String>,
    pub dni_apoderado: Option<String>,
    pub parentesco: Option<String>,
    pub ocupacion: Option<String>,
    pub grado_instruccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub direccion_apoderado: Option<String>,
    pub anio_escolar: Option<String>,
    pub fecha_solicitud: Option<String>,
    pub estado: Option<String>,
    pub comentarios: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferRequestPayload {
    #[serde(flatten)]
    pub base: NewRequestPayload,
    pub colegio_anterior: Option<String>,
    pub motivo_traslado: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PromotionRequestPayload {
    pub estudiante_id: Option<i64>,
    pub grado_actual: Option<i64>,
    pub grado_siguiente: Option<i64>,
    pub anio_escolar_actual: Option<String>,
    pub anio_escolar_siguiente: Option<String>,
    pub fecha_solicitud: Option<String>,
    pub estado: Option<String>,
    pub comentarios: Option<String>,
}

/// Envelope for the DNI-keyed reads: the caller learns whether the
/// student exists even when no requests do.
#[derive(Debug, Serialize)]
pub struct DniEnvelope<T: Serialize> {
    pub success: bool,
    pub dni_estudiante: String,
    pub nombre_estudiante: Option<String>,
    pub total_solicitudes: usize,
    pub solicitudes: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensaje: Option<String>,
}
