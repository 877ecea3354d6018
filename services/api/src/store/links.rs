use matricula::directory::guardians::Guardian;
use matricula::directory::links::{LinkStore, NewLinkRecord, StudentGuardianLink};
use matricula::directory::students::Student;
use matricula::store::StoreError;
use rusqlite::Row;

use super::guardians::row_to_guardian;
use super::students::row_to_student;
use super::Database;

pub struct SqliteLinkStore {
    db: Database,
}

impl SqliteLinkStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn row_to_link(row: &Row<'_>) -> rusqlite::Result<StudentGuardianLink> {
    Ok(StudentGuardianLink {
        id: row.get(0)?,
        estudiante_id: row.get(1)?,
        apoderado_id: row.get(2)?,
        es_principal: row.get(3)?,
    })
}

impl LinkStore for SqliteLinkStore {
    fn insert(&self, record: NewLinkRecord) -> Result<StudentGuardianLink, StoreError> {
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO relaciones_apoderado_estudiante(estudiante_id, apoderado_id, es_principal)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![record.estudiante_id, record.apoderado_id, record.es_principal],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                "SELECT id, estudiante_id, apoderado_id, es_principal
                 FROM relaciones_apoderado_estudiante WHERE id = ?1",
                [id],
                row_to_link,
            )
        })
    }

    fn fetch(&self, id: i64) -> Result<Option<StudentGuardianLink>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, estudiante_id, apoderado_id, es_principal
                 FROM relaciones_apoderado_estudiante WHERE id = ?1",
            )?;
            let mut rows = stmt.query_map([id], row_to_link)?;
            rows.next().transpose()
        })
    }

    fn list(&self) -> Result<Vec<StudentGuardianLink>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, estudiante_id, apoderado_id, es_principal
                 FROM relaciones_apoderado_estudiante ORDER BY id",
            )?;
            let rows = stmt.query_map([], row_to_link)?;
            rows.collect()
        })
    }

    fn pair_exists(&self, estudiante_id: i64, apoderado_id: i64) -> Result<bool, StoreError> {
        self.db.with(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM relaciones_apoderado_estudiante
                 WHERE estudiante_id = ?1 AND apoderado_id = ?2",
                [estudiante_id, apoderado_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    fn guardians_of(&self, estudiante_id: i64) -> Result<Vec<Guardian>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.nombre, a.dni, a.parentesco, a.ocupacion, a.grado_instruccion,
                        a.telefono, a.email, a.direccion
                 FROM apoderados a
                 JOIN relaciones_apoderado_estudiante r ON r.apoderado_id = a.id
                 WHERE r.estudiante_id = ?1
                 ORDER BY r.es_principal DESC, a.id",
            )?;
            let rows = stmt.query_map([estudiante_id], row_to_guardian)?;
            rows.collect()
        })
    }

    fn students_of(&self, apoderado_id: i64) -> Result<Vec<Student>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(
                "SELECT e.id, e.nombre, e.dni, e.fecha_nacimiento, e.genero, e.grado_actual,
                        e.direccion, e.estado, e.fecha_ingreso
                 FROM estudiantes e
                 JOIN relaciones_apoderado_estudiante r ON r.estudiante_id = e.id
                 WHERE r.apoderado_id = ?1
                 ORDER BY e.id",
            )?;
            let rows = stmt.query_map([apoderado_id], row_to_student)?;
            rows.collect()
        })
    }

    fn delete(&self, id: i64) -> Result<usize, StoreError> {
        self.db.with(|conn| {
            conn.execute(
                "DELETE FROM relaciones_apoderado_estudiante WHERE id = ?1",
                [id],
            )
        })
    }
}
