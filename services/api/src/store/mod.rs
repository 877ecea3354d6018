//! SQLite-backed implementations of the domain store traits.
//!
//! The schema is created on open; constraint failures are classified
//! here so the services above never see raw driver messages.

mod documents;
mod guardians;
mod links;
mod observations;
mod requests;
mod students;
mod years;

pub use documents::SqliteAttachmentStore;
pub use guardians::SqliteGuardianStore;
pub use links::SqliteLinkStore;
pub use observations::SqliteObservationStore;
pub use requests::{SqliteNewRequestStore, SqlitePromotionRequestStore, SqliteTransferRequestStore};
pub use students::SqliteStudentStore;
pub use years::SqliteSchoolYearStore;

use std::path::Path;
use std::sync::{Arc, Mutex};

use matricula::store::StoreError;
use rusqlite::Connection;

/// Shared handle over one SQLite connection. The mutex is the bound on
/// in-flight database work.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (creating the schema if needed). The caller is responsible
    /// for the parent directory existing.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn with<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection mutex poisoned".to_string()))?;
        f(&conn).map_err(map_store_error)
    }
}

/// Pattern-match the driver's constraint text into the domain error
/// taxonomy. "UNIQUE constraint failed: estudiantes.dni" carries the
/// violating column; foreign-key failures carry nothing useful.
pub(crate) fn map_store_error(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(code, Some(message)) = &err {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            if let Some(rest) = message.strip_prefix("UNIQUE constraint failed: ") {
                let column = rest
                    .split(',')
                    .next()
                    .unwrap_or(rest)
                    .rsplit('.')
                    .next()
                    .unwrap_or(rest)
                    .trim()
                    .to_string();
                return StoreError::Conflict { field: column };
            }
            if message.contains("FOREIGN KEY") {
                return StoreError::Referenced;
            }
        }
    }
    StoreError::Unavailable(err.to_string())
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS estudiantes(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL,
            dni TEXT NOT NULL UNIQUE,
            fecha_nacimiento TEXT NOT NULL,
            genero TEXT NOT NULL,
            grado_actual INTEGER NOT NULL,
            direccion TEXT NOT NULL,
            estado TEXT NOT NULL DEFAULT 'activo',
            fecha_ingreso TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS apoderados(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL,
            dni TEXT NOT NULL UNIQUE,
            parentesco TEXT NOT NULL,
            ocupacion TEXT NOT NULL,
            grado_instruccion TEXT NOT NULL,
            telefono TEXT NOT NULL,
            email TEXT NOT NULL,
            direccion TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS relaciones_apoderado_estudiante(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            estudiante_id INTEGER NOT NULL,
            apoderado_id INTEGER NOT NULL,
            es_principal INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(estudiante_id) REFERENCES estudiantes(id),
            FOREIGN KEY(apoderado_id) REFERENCES apoderados(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_relaciones_estudiante
         ON relaciones_apoderado_estudiante(estudiante_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_relaciones_apoderado
         ON relaciones_apoderado_estudiante(apoderado_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS anios_escolares(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            anio TEXT NOT NULL UNIQUE,
            descripcion TEXT,
            fecha_inicio TEXT NOT NULL,
            fecha_fin TEXT NOT NULL,
            estado TEXT NOT NULL DEFAULT 'planificado'
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS solicitud_matricula_nueva(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre_estudiante TEXT NOT NULL,
            dni_estudiante TEXT NOT NULL,
            fecha_nacimiento TEXT NOT NULL,
            genero TEXT NOT NULL,
            grado_solicitado INTEGER NOT NULL,
            direccion TEXT NOT NULL,
            nombre_apoderado TEXT NOT NULL,
            dni_apoderado TEXT NOT NULL,
            parentesco TEXT NOT NULL,
            ocupacion TEXT NOT NULL,
            grado_instruccion TEXT NOT NULL,
            telefono TEXT NOT NULL,
            email TEXT,
            direccion_apoderado TEXT NOT NULL,
            anio_escolar TEXT NOT NULL,
            fecha_solicitud TEXT NOT NULL,
            estado TEXT NOT NULL DEFAULT 'pendiente',
            comentarios TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_nueva_dni ON solicitud_matricula_nueva(dni_estudiante)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_nueva_anio ON solicitud_matricula_nueva(anio_escolar)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS solicitud_traslado(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre_estudiante TEXT NOT NULL,
            dni_estudiante TEXT NOT NULL,
            fecha_nacimiento TEXT NOT NULL,
            genero TEXT NOT NULL,
            grado_solicitado INTEGER NOT NULL,
            direccion TEXT NOT NULL,
            nombre_apoderado TEXT NOT NULL,
            dni_apoderado TEXT NOT NULL,
            parentesco TEXT NOT NULL,
            ocupacion TEXT NOT NULL,
            grado_instruccion TEXT NOT NULL,
            telefono TEXT NOT NULL,
            email TEXT,
            direccion_apoderado TEXT NOT NULL,
            colegio_anterior TEXT NOT NULL,
            motivo_traslado TEXT,
            anio_escolar TEXT NOT NULL,
            fecha_solicitud TEXT NOT NULL,
            estado TEXT NOT NULL DEFAULT 'pendiente',
            comentarios TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_traslado_dni ON solicitud_traslado(dni_estudiante)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_traslado_anio ON solicitud_traslado(anio_escolar)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS solicitud_siguiente_grado(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            estudiante_id INTEGER NOT NULL,
            grado_actual INTEGER NOT NULL,
            grado_siguiente INTEGER NOT NULL,
            anio_escolar_actual TEXT NOT NULL,
            anio_escolar_siguiente TEXT NOT NULL,
            fecha_solicitud TEXT NOT NULL,
            estado TEXT NOT NULL DEFAULT 'pendiente',
            comentarios TEXT,
            FOREIGN KEY(estudiante_id) REFERENCES estudiantes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_siguiente_estudiante
         ON solicitud_siguiente_grado(estudiante_id)",
        [],
    )?;

    // No foreign key on solicitud_id: the reference spans three tables.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documentos(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tipo_solicitud TEXT NOT NULL,
            solicitud_id INTEGER NOT NULL,
            tipo_documento TEXT NOT NULL,
            nombre_archivo TEXT NOT NULL,
            ruta_archivo TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documentos_solicitud
         ON documentos(tipo_solicitud, solicitud_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS observaciones(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tipo_solicitud TEXT NOT NULL,
            solicitud_id INTEGER NOT NULL,
            fecha_creacion TEXT NOT NULL DEFAULT (datetime('now')),
            tipo TEXT NOT NULL,
            descripcion TEXT NOT NULL,
            es_visible_para_padres INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_observaciones_solicitud
         ON observaciones(tipo_solicitud, solicitud_id)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_carry_the_column_name() {
        let db = Database::open_in_memory().expect("schema builds");
        db.with(|conn| {
            conn.execute(
                "INSERT INTO estudiantes(nombre, dni, fecha_nacimiento, genero, grado_actual, direccion, estado, fecha_ingreso)
                 VALUES ('A', '12345678', '2015-01-01', 'F', 3, 'x', 'activo', '2024-01-01')",
                [],
            )
        })
        .expect("first insert");

        let err = db
            .with(|conn| {
                conn.execute(
                    "INSERT INTO estudiantes(nombre, dni, fecha_nacimiento, genero, grado_actual, direccion, estado, fecha_ingreso)
                     VALUES ('B', '12345678', '2015-01-01', 'M', 2, 'y', 'activo', '2024-01-01')",
                    [],
                )
            })
            .expect_err("duplicate dni");
        match err {
            StoreError::Conflict { field } => assert_eq!(field, "dni"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn foreign_key_violations_map_to_referenced() {
        let db = Database::open_in_memory().expect("schema builds");
        let err = db
            .with(|conn| {
                conn.execute(
                    "INSERT INTO solicitud_siguiente_grado(estudiante_id, grado_actual, grado_siguiente,
                        anio_escolar_actual, anio_escolar_siguiente, fecha_solicitud)
                     VALUES (99, 3, 4, '2024', '2025', '2024-11-02')",
                    [],
                )
            })
            .expect_err("dangling student id");
        assert!(matches!(err, StoreError::Referenced));
    }
}
