use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::directory::students::{
    NewStudentRecord, Sex, Student, StudentChanges, StudentStatus, StudentStore,
};
use crate::enrollment::domain::{
    NewEnrollmentChanges, NewEnrollmentDraft, NewEnrollmentRequest, NewRequestPayload,
    PromotionChanges, PromotionDraft, PromotionRequest, PromotionRequestPayload, RequestStatus,
    TransferChanges, TransferDraft, TransferRequest, TransferRequestPayload,
};
use crate::enrollment::repository::{NewRequestStore, PromotionRequestStore, TransferRequestStore};
use crate::enrollment::service::EnrollmentService;
use crate::store::StoreError;

pub(super) fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid test date")
}

#[derive(Default)]
pub(super) struct MemoryStudents {
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
        Ok(self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn update(&self, id: i64, changes: &StudentChanges) -> Result<usize, StoreError> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        match rows.get_mut(&id) {
            None => Ok(0),
            Some(student) => {
                if let Some(v) = changes.grado_actual {
                    student.grado_actual = v;
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

#[derive(Default)]
pub(super) struct MemoryNewRequests {
    rows: Mutex<HashMap<i64, NewEnrollmentRequest>>,
    next_id: Mutex<i64>,
}

impl NewRequestStore for MemoryNewRequests {
    fn insert(&self, draft: NewEnrollmentDraft) -> Result<i64, StoreError> {
        let mut next = self.next_id.lock().expect("id mutex poisoned");
        *next += 1;
        let request = NewEnrollmentRequest {
            id: *next,
            nombre_estudiante: draft.nombre_estudiante,
            dni_estudiante: draft.dni_estudiante,
            fecha_nacimiento: draft.fecha_nacimiento,
            genero: draft.genero,
            grado_solicitado: draft.grado_solicitado,
            direccion: draft.direccion,
            nombre_apoderado: draft.nombre_apoderado,
            dni_apoderado: draft.dni_apoderado,
            parentesco: draft.parentesco,
            ocupacion: draft.ocupacion,
            grado_instruccion: draft.grado_instruccion,
            telefono: draft.telefono,
            email: draft.email,
            direccion_apoderado: draft.direccion_apoderado,
            anio_escolar: draft.anio_escolar,
            fecha_solicitud: draft.fecha_solicitud,
            estado: draft.estado,
            comentarios: draft.comentarios,
        };
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .insert(request.id, request.clone());
        Ok(request.id)
    }

    fn fetch(&self, id: i64) -> Result<Option<NewEnrollmentRequest>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn list(&self) -> Result<Vec<NewEnrollmentRequest>, StoreError> {
        let mut all: Vec<NewEnrollmentRequest> = self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    fn by_year(&self, anio: &str) -> Result<Vec<NewEnrollmentRequest>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.anio_escolar == anio)
            .collect())
    }

    fn by_student_dni(&self, dni: &str) -> Result<Vec<NewEnrollmentRequest>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.dni_estudiante == dni)
            .collect())
    }

    fn update(&self, id: i64, changes: &NewEnrollmentChanges) -> Result<usize, StoreError> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        match rows.get_mut(&id) {
            None => Ok(0),
            Some(request) => {
                if let Some(v) = &changes.nombre_estudiante {
                    request.nombre_estudiante = v.clone();
                }
                if let Some(v) = &changes.anio_escolar {
                    request.anio_escolar = v.clone();
                }
                if let Some(v) = changes.estado {
                    request.estado = v;
                }
                if let Some(v) = changes.fecha_solicitud {
                    request.fecha_solicitud = v;
                }
                if let Some(v) = &changes.comentarios {
                    request.comentarios = v.clone();
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

#[derive(Default)]
pub(super) struct MemoryTransfers {
    rows: Mutex<HashMap<i64, TransferRequest>>,
    next_id: Mutex<i64>,
}

impl TransferRequestStore for MemoryTransfers {
    fn insert(&self, draft: TransferDraft) -> Result<i64, StoreError> {
        let mut next = self.next_id.lock().expect("id mutex poisoned");
        *next += 1;
        let base = draft.base;
        let request = TransferRequest {
            id: *next,
            nombre_estudiante: base.nombre_estudiante,
            dni_estudiante: base.dni_estudiante,
            fecha_nacimiento: base.fecha_nacimiento,
            genero: base.genero,
            grado_solicitado: base.grado_solicitado,
            direccion: base.direccion,
            nombre_apoderado: base.nombre_apoderado,
            dni_apoderado: base.dni_apoderado,
            parentesco: base.parentesco,
            ocupacion: base.ocupacion,
            grado_instruccion: base.grado_instruccion,
            telefono: base.telefono,
            email: base.email,
            direccion_apoderado: base.direccion_apoderado,
            colegio_anterior: draft.colegio_anterior,
            motivo_traslado: draft.motivo_traslado,
            anio_escolar: base.anio_escolar,
            fecha_solicitud: base.fecha_solicitud,
            estado: base.estado,
            comentarios: base.comentarios,
        };
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .insert(request.id, request.clone());
        Ok(request.id)
    }

    fn fetch(&self, id: i64) -> Result<Option<TransferRequest>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn list(&self) -> Result<Vec<TransferRequest>, StoreError> {
        let mut all: Vec<TransferRequest> = self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    fn by_year(&self, anio: &str) -> Result<Vec<TransferRequest>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.anio_escolar == anio)
            .collect())
    }

    fn by_student_dni(&self, dni: &str) -> Result<Vec<TransferRequest>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.dni_estudiante == dni)
            .collect())
    }

    fn update(&self, id: i64, changes: &TransferChanges) -> Result<usize, StoreError> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        match rows.get_mut(&id) {
            None => Ok(0),
            Some(request) => {
                if let Some(v) = &changes.base.anio_escolar {
                    request.anio_escolar = v.clone();
                }
                if let Some(v) = changes.base.estado {
                    request.estado = v;
                }
                if let Some(v) = &changes.colegio_anterior {
                    request.colegio_anterior = v.clone();
                }
                if let Some(v) = &changes.motivo_traslado {
                    request.motivo_traslado = v.clone();
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

#[derive(Default)]
pub(super) struct MemoryPromotions {
    rows: Mutex<HashMap<i64, PromotionRequest>>,
    next_id: Mutex<i64>,
}

impl PromotionRequestStore for MemoryPromotions {
    fn insert(&self, draft: PromotionDraft) -> Result<i64, StoreError> {
        let mut next = self.next_id.lock().expect("id mutex poisoned");
        *next += 1;
        let request = PromotionRequest {
            id: *next,
            estudiante_id: draft.estudiante_id,
            grado_actual: draft.grado_actual,
            grado_siguiente: draft.grado_siguiente,
            anio_escolar_actual: draft.anio_escolar_actual,
            anio_escolar_siguiente: draft.anio_escolar_siguiente,
            fecha_solicitud: draft.fecha_solicitud,
            estado: draft.estado,
            comentarios: draft.comentarios,
        };
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .insert(request.id, request.clone());
        Ok(request.id)
    }

    fn fetch(&self, id: i64) -> Result<Option<PromotionRequest>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn list(&self) -> Result<Vec<PromotionRequest>, StoreError> {
        let mut all: Vec<PromotionRequest> = self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    fn by_current_year(&self, anio: &str) -> Result<Vec<PromotionRequest>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.anio_escolar_actual == anio)
            .collect())
    }

    fn by_next_year(&self, anio: &str) -> Result<Vec<PromotionRequest>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.anio_escolar_siguiente == anio)
            .collect())
    }

    fn by_student(&self, estudiante_id: i64) -> Result<Vec<PromotionRequest>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.estudiante_id == estudiante_id)
            .collect())
    }

    fn update(&self, id: i64, changes: &PromotionChanges) -> Result<usize, StoreError> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        match rows.get_mut(&id) {
            None => Ok(0),
            Some(request) => {
                if let Some(v) = changes.estudiante_id {
                    request.estudiante_id = v;
                }
                if let Some(v) = changes.grado_actual {
                    request.grado_actual = v;
                }
                if let Some(v) = changes.grado_siguiente {
                    request.grado_siguiente = v;
                }
                if let Some(v) = &changes.anio_escolar_actual {
                    request.anio_escolar_actual = v.clone();
                }
                if let Some(v) = &changes.anio_escolar_siguiente {
                    request.anio_escolar_siguiente = v.clone();
                }
                if let Some(v) = changes.fecha_solicitud {
                    request.fecha_solicitud = v;
                }
                if let Some(v) = changes.estado {
                    request.estado = v;
                }
                if let Some(v) = &changes.comentarios {
                    request.comentarios = v.clone();
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

pub(super) struct Fixture {
    pub service: Arc<EnrollmentService>,
    pub students: Arc<MemoryStudents>,
}

pub(super) fn fixture() -> Fixture {
    let students = Arc::new(MemoryStudents::default());
    let service = Arc::new(EnrollmentService::new(
        Arc::new(MemoryNewRequests::default()),
        Arc::new(MemoryTransfers::default()),
        Arc::new(MemoryPromotions::default()),
        students.clone(),
    ));
    Fixture { service, students }
}

pub(super) fn seed_student(
    students: &MemoryStudents,
    dni: &str,
    grado_actual: u8,
    estado: StudentStatus,
) -> Student {
    students
        .insert(NewStudentRecord {
            nombre: "Lucía Fernández".to_string(),
            dni: dni.to_string(),
            fecha_nacimiento: date("2015-03-12"),
            genero: Sex::Female,
            grado_actual,
            direccion: "Av. Los Álamos 120".to_string(),
            estado,
            fecha_ingreso: date("2021-03-01"),
        })
        .expect("student seeded")
}

pub(super) fn new_payload(dni: &str, fecha: &str) -> NewRequestPayload {
    NewRequestPayload {
        nombre_estudiante: Some("Lucía Fernández".to_string()),
        dni_estudiante: Some(dni.to_string()),
        fecha_nacimiento: Some("2015-03-12".to_string()),
        genero: Some("F".to_string()),
        grado_solicitado: Some(3),
        direccion: Some("Av. Los Álamos 120".to_string()),
        nombre_apoderado: Some("Rosa Quispe".to_string()),
        dni_apoderado: Some("87654321".to_string()),
        parentesco: Some("madre".to_string()),
        ocupacion: Some("docente".to_string()),
        grado_instruccion: Some("superior".to_string()),
        telefono: Some("999888777".to_string()),
        email: Some("rosa.quispe@example.com".to_string()),
        direccion_apoderado: Some("Jr. Las Flores 456".to_string()),
        anio_escolar: Some("2025".to_string()),
        fecha_solicitud: Some(fecha.to_string()),
        estado: None,
        comentarios: None,
    }
}

pub(super) fn transfer_payload(dni: &str, fecha: &str) -> TransferRequestPayload {
    TransferRequestPayload {
        base: new_payload(dni, fecha),
        colegio_anterior: Some("IE San Martín".to_string()),
        motivo_traslado: Some("cambio de domicilio".to_string()),
    }
}

pub(super) fn promotion_payload(estudiante_id: i64, fecha: &str) -> PromotionRequestPayload {
    PromotionRequestPayload {
        estudiante_id: Some(estudiante_id),
        grado_actual: Some(3),
        grado_siguiente: Some(4),
        anio_escolar_actual: Some("2024".to_string()),
        anio_escolar_siguiente: Some("2025".to_string()),
        fecha_solicitud: Some(fecha.to_string()),
        estado: None,
        comentarios: None,
    }
}

pub(super) fn assert_pending(estado: RequestStatus) {
    assert_eq!(estado, RequestStatus::Pending);
}
