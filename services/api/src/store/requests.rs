use matricula::directory::students::Sex;
use matricula::enrollment::domain::{
    NewEnrollmentChanges, NewEnrollmentDraft, NewEnrollmentRequest, PromotionChanges,
    PromotionDraft, PromotionRequest, RequestStatus, TransferChanges, TransferDraft,
    TransferRequest,
};
use matricula::enrollment::{NewRequestStore, PromotionRequestStore, TransferRequestStore};
use matricula::store::StoreError;
use rusqlite::{Row, ToSql};

use super::Database;

fn parse_sex(raw: String) -> Sex {
    Sex::parse(&raw).unwrap_or(Sex::Male)
}

fn parse_status(raw: String) -> RequestStatus {
    RequestStatus::parse(&raw).unwrap_or(RequestStatus::Pending)
}

// ---- new enrollment ----

pub struct SqliteNewRequestStore {
    db: Database,
}

impl SqliteNewRequestStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const NEW_COLUMNS: &str = "id, nombre_estudiante, dni_estudiante, fecha_nacimiento, genero, \
     grado_solicitado, direccion, nombre_apoderado, dni_apoderado, parentesco, ocupacion, \
     grado_instruccion, telefono, email, direccion_apoderado, anio_escolar, fecha_solicitud, \
     estado, comentarios";

fn row_to_new(row: &Row<'_>) -> rusqlite::Result<NewEnrollmentRequest> {
    Ok(NewEnrollmentRequest {
        id: row.get(0)?,
        nombre_estudiante: row.get(1)?,
        dni_estudiante: row.get(2)?,
        fecha_nacimiento: row.get(3)?,
        genero: parse_sex(row.get(4)?),
        grado_solicitado: row.get(5)?,
        direccion: row.get(6)?,
        nombre_apoderado: row.get(7)?,
        dni_apoderado: row.get(8)?,
        parentesco: row.get(9)?,
        ocupacion: row.get(10)?,
        grado_instruccion: row.get(11)?,
        telefono: row.get(12)?,
        email: row.get(13)?,
        direccion_apoderado: row.get(14)?,
        anio_escolar: row.get(15)?,
        fecha_solicitud: row.get(16)?,
        estado: parse_status(row.get(17)?),
        comentarios: row.get(18)?,
    })
}

/// Shared SET-clause builder for the columns the two denormalized
/// variants have in common.
fn push_base_changes(
    changes: &NewEnrollmentChanges,
    sets: &mut Vec<&'static str>,
    params: &mut Vec<Box<dyn ToSql>>,
) {
    if let Some(v) = &changes.nombre_estudiante {
        sets.push("nombre_estudiante = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = &changes.dni_estudiante {
        sets.push("dni_estudiante = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = changes.fecha_nacimiento {
        sets.push("fecha_nacimiento = ?");
        params.push(Box::new(v));
    }
    if let Some(v) = changes.genero {
        sets.push("genero = ?");
        params.push(Box::new(v.label()));
    }
    if let Some(v) = changes.grado_solicitado {
        sets.push("grado_solicitado = ?");
        params.push(Box::new(v));
    }
    if let Some(v) = &changes.direccion {
        sets.push("direccion = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = &changes.nombre_apoderado {
        sets.push("nombre_apoderado = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = &changes.dni_apoderado {
        sets.push("dni_apoderado = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = &changes.parentesco {
        sets.push("parentesco = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = &changes.ocupacion {
        sets.push("ocupacion = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = &changes.grado_instruccion {
        sets.push("grado_instruccion = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = &changes.telefono {
        sets.push("telefono = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = &changes.email {
        sets.push("email = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = &changes.direccion_apoderado {
        sets.push("direccion_apoderado = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = &changes.anio_escolar {
        sets.push("anio_escolar = ?");
        params.push(Box::new(v.clone()));
    }
    if let Some(v) = changes.fecha_solicitud {
        sets.push("fecha_solicitud = ?");
        params.push(Box::new(v));
    }
    if let Some(v) = changes.estado {
        sets.push("estado = ?");
        params.push(Box::new(v.label()));
    }
    if let Some(v) = &changes.comentarios {
        sets.push("comentarios = ?");
        params.push(Box::new(v.clone()));
    }
}

impl NewRequestStore for SqliteNewRequestStore {
    fn insert(&self, draft: NewEnrollmentDraft) -> Result<i64, StoreError> {
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO solicitud_matricula_nueva(
                    nombre_estudiante, dni_estudiante, fecha_nacimiento, genero,
                    grado_solicitado, direccion, nombre_apoderado, dni_apoderado,
                    parentesco, ocupacion, grado_instruccion, telefono, email,
                    direccion_apoderado, anio_escolar, fecha_solicitud, estado, comentarios
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                rusqlite::params![
                    draft.nombre_estudiante,
                    draft.dni_estudiante,
                    draft.fecha_nacimiento,
                    draft.genero.label(),
                    draft.grado_solicitado,
                    draft.direccion,
                    draft.nombre_apoderado,
                    draft.dni_apoderado,
                    draft.parentesco,
                    draft.ocupacion,
                    draft.grado_instruccion,
                    draft.telefono,
                    draft.email,
                    draft.direccion_apoderado,
                    draft.anio_escolar,
                    draft.fecha_solicitud,
                    draft.estado.label(),
                    draft.comentarios,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn fetch(&self, id: i64) -> Result<Option<NewEnrollmentRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NEW_COLUMNS} FROM solicitud_matricula_nueva WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map([id], row_to_new)?;
            rows.next().transpose()
        })
    }

    fn list(&self) -> Result<Vec<NewEnrollmentRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NEW_COLUMNS} FROM solicitud_matricula_nueva ORDER BY id"
            ))?;
            let rows = stmt.query_map([], row_to_new)?;
            rows.collect()
        })
    }

    fn by_year(&self, anio: &str) -> Result<Vec<NewEnrollmentRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NEW_COLUMNS} FROM solicitud_matricula_nueva WHERE anio_escolar = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([anio], row_to_new)?;
            rows.collect()
        })
    }

    fn by_student_dni(&self, dni: &str) -> Result<Vec<NewEnrollmentRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NEW_COLUMNS} FROM solicitud_matricula_nueva WHERE dni_estudiante = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([dni], row_to_new)?;
            rows.collect()
        })
    }

    fn update(&self, id: i64, changes: &NewEnrollmentChanges) -> Result<usize, StoreError> {
        let mut sets: Vec<&'static str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        push_base_changes(changes, &mut sets, &mut params);

        if sets.is_empty() {
            return Ok(0);
        }
        params.push(Box::new(id));

        let sql = format!(
            "UPDATE solicitud_matricula_nueva SET {} WHERE id = ?",
            sets.join(", ")
        );
        self.db.with(|conn| {
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, refs.as_slice())
        })
    }

    fn delete(&self, id: i64) -> Result<usize, StoreError> {
        self.db.with(|conn| {
            conn.execute("DELETE FROM solicitud_matricula_nueva WHERE id = ?1", [id])
        })
    }
}

// ---- transfer ----

pub struct SqliteTransferRequestStore {
    db: Database,
}

impl SqliteTransferRequestStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const TRANSFER_COLUMNS: &str = "id, nombre_estudiante, dni_estudiante, fecha_nacimiento, genero, \
     grado_solicitado, direccion, nombre_apoderado, dni_apoderado, parentesco, ocupacion, \
     grado_instruccion, telefono, email, direccion_apoderado, colegio_anterior, motivo_traslado, \
     anio_escolar, fecha_solicitud, estado, comentarios";

fn row_to_transfer(row: &Row<'_>) -> rusqlite::Result<TransferRequest> {
    Ok(TransferRequest {
        id: row.get(0)?,
        nombre_estudiante: row.get(1)?,
        dni_estudiante: row.get(2)?,
        fecha_nacimiento: row.get(3)?,
        genero: parse_sex(row.get(4)?),
        grado_solicitado: row.get(5)?,
        direccion: row.get(6)?,
        nombre_apoderado: row.get(7)?,
        dni_apoderado: row.get(8)?,
        parentesco: row.get(9)?,
        ocupacion: row.get(10)?,
        grado_instruccion: row.get(11)?,
        telefono: row.get(12)?,
        email: row.get(13)?,
        direccion_apoderado: row.get(14)?,
        colegio_anterior: row.get(15)?,
        motivo_traslado: row.get(16)?,
        anio_escolar: row.get(17)?,
        fecha_solicitud: row.get(18)?,
        estado: parse_status(row.get(19)?),
        comentarios: row.get(20)?,
    })
}

impl TransferRequestStore for SqliteTransferRequestStore {
    fn insert(&self, draft: TransferDraft) -> Result<i64, StoreError> {
        let base = draft.base;
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO solicitud_traslado(
                    nombre_estudiante, dni_estudiante, fecha_nacimiento, genero,
                    grado_solicitado, direccion, nombre_apoderado, dni_apoderado,
                    parentesco, ocupacion, grado_instruccion, telefono, email,
                    direccion_apoderado, colegio_anterior, motivo_traslado,
                    anio_escolar, fecha_solicitud, estado, comentarios
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
                rusqlite::params![
                    base.nombre_estudiante,
                    base.dni_estudiante,
                    base.fecha_nacimiento,
                    base.genero.label(),
                    base.grado_solicitado,
                    base.direccion,
                    base.nombre_apoderado,
                    base.dni_apoderado,
                    base.parentesco,
                    base.ocupacion,
                    base.grado_instruccion,
                    base.telefono,
                    base.email,
                    base.direccion_apoderado,
                    draft.colegio_anterior,
                    draft.motivo_traslado,
                    base.anio_escolar,
                    base.fecha_solicitud,
                    base.estado.label(),
                    base.comentarios,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn fetch(&self, id: i64) -> Result<Option<TransferRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRANSFER_COLUMNS} FROM solicitud_traslado WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map([id], row_to_transfer)?;
            rows.next().transpose()
        })
    }

    fn list(&self) -> Result<Vec<TransferRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRANSFER_COLUMNS} FROM solicitud_traslado ORDER BY id"
            ))?;
            let rows = stmt.query_map([], row_to_transfer)?;
            rows.collect()
        })
    }

    fn by_year(&self, anio: &str) -> Result<Vec<TransferRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRANSFER_COLUMNS} FROM solicitud_traslado WHERE anio_escolar = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([anio], row_to_transfer)?;
            rows.collect()
        })
    }

    fn by_student_dni(&self, dni: &str) -> Result<Vec<TransferRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRANSFER_COLUMNS} FROM solicitud_traslado WHERE dni_estudiante = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([dni], row_to_transfer)?;
            rows.collect()
        })
    }

    fn update(&self, id: i64, changes: &TransferChanges) -> Result<usize, StoreError> {
        let mut sets: Vec<&'static str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        push_base_changes(&changes.base, &mut sets, &mut params);

        if let Some(v) = &changes.colegio_anterior {
            sets.push("colegio_anterior = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &changes.motivo_traslado {
            sets.push("motivo_traslado = ?");
            params.push(Box::new(v.clone()));
        }

        if sets.is_empty() {
            return Ok(0);
        }
        params.push(Box::new(id));

        let sql = format!(
            "UPDATE solicitud_traslado SET {} WHERE id = ?",
            sets.join(", ")
        );
        self.db.with(|conn| {
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, refs.as_slice())
        })
    }

    fn delete(&self, id: i64) -> Result<usize, StoreError> {
        self.db
            .with(|conn| conn.execute("DELETE FROM solicitud_traslado WHERE id = ?1", [id]))
    }
}

// ---- promotion ----

pub struct SqlitePromotionRequestStore {
    db: Database,
}

impl SqlitePromotionRequestStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const PROMOTION_COLUMNS: &str = "id, estudiante_id, grado_actual, grado_siguiente, \
     anio_escolar_actual, anio_escolar_siguiente, fecha_solicitud, estado, comentarios";

fn row_to_promotion(row: &Row<'_>) -> rusqlite::Result<PromotionRequest> {
    Ok(PromotionRequest {
        id: row.get(0)?,
        estudiante_id: row.get(1)?,
        grado_actual: row.get(2)?,
        grado_siguiente: row.get(3)?,
        anio_escolar_actual: row.get(4)?,
        anio_escolar_siguiente: row.get(5)?,
        fecha_solicitud: row.get(6)?,
        estado: parse_status(row.get(7)?),
        comentarios: row.get(8)?,
    })
}

impl PromotionRequestStore for SqlitePromotionRequestStore {
    fn insert(&self, draft: PromotionDraft) -> Result<i64, StoreError> {
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO solicitud_siguiente_grado(
                    estudiante_id, grado_actual, grado_siguiente,
                    anio_escolar_actual, anio_escolar_siguiente,
                    fecha_solicitud, estado, comentarios
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    draft.estudiante_id,
                    draft.grado_actual,
                    draft.grado_siguiente,
                    draft.anio_escolar_actual,
                    draft.anio_escolar_siguiente,
                    draft.fecha_solicitud,
                    draft.estado.label(),
                    draft.comentarios,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn fetch(&self, id: i64) -> Result<Option<PromotionRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROMOTION_COLUMNS} FROM solicitud_siguiente_grado WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map([id], row_to_promotion)?;
            rows.next().transpose()
        })
    }

    fn list(&self) -> Result<Vec<PromotionRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROMOTION_COLUMNS} FROM solicitud_siguiente_grado ORDER BY id"
            ))?;
            let rows = stmt.query_map([], row_to_promotion)?;
            rows.collect()
        })
    }

    fn by_current_year(&self, anio: &str) -> Result<Vec<PromotionRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROMOTION_COLUMNS} FROM solicitud_siguiente_grado
                 WHERE anio_escolar_actual = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([anio], row_to_promotion)?;
            rows.collect()
        })
    }

    fn by_next_year(&self, anio: &str) -> Result<Vec<PromotionRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROMOTION_COLUMNS} FROM solicitud_siguiente_grado
                 WHERE anio_escolar_siguiente = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([anio], row_to_promotion)?;
            rows.collect()
        })
    }

    fn by_student(&self, estudiante_id: i64) -> Result<Vec<PromotionRequest>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROMOTION_COLUMNS} FROM solicitud_siguiente_grado
                 WHERE estudiante_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([estudiante_id], row_to_promotion)?;
            rows.collect()
        })
    }

    fn update(&self, id: i64, changes: &PromotionChanges) -> Result<usize, StoreError> {
        let mut sets: Vec<&'static str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(v) = changes.estudiante_id {
            sets.push("estudiante_id = ?");
            params.push(Box::new(v));
        }
        if let Some(v) = changes.grado_actual {
            sets.push("grado_actual = ?");
            params.push(Box::new(v));
        }
        if let Some(v) = changes.grado_siguiente {
            sets.push("grado_siguiente = ?");
            params.push(Box::new(v));
        }
        if let Some(v) = &changes.anio_escolar_actual {
            sets.push("anio_escolar_actual = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &changes.anio_escolar_siguiente {
            sets.push("anio_escolar_siguiente = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = changes.fecha_solicitud {
            sets.push("fecha_solicitud = ?");
            params.push(Box::new(v));
        }
        if let Some(v) = changes.estado {
            sets.push("estado = ?");
            params.push(Box::new(v.label()));
        }
        if let Some(v) = &changes.comentarios {
            sets.push("comentarios = ?");
            params.push(Box::new(v.clone()));
        }

        if sets.is_empty() {
            return Ok(0);
        }
        params.push(Box::new(id));

        let sql = format!(
            "UPDATE solicitud_siguiente_grado SET {} WHERE id = ?",
            sets.join(", ")
        );
        self.db.with(|conn| {
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, refs.as_slice())
        })
    }

    fn delete(&self, id: i64) -> Result<usize, StoreError> {
        self.db.with(|conn| {
            conn.execute("DELETE FROM solicitud_siguiente_grado WHERE id = ?1", [id])
        })
    }
}
