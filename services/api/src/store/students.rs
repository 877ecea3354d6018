use matricula::directory::students::{
    NewStudentRecord, Sex, Student, StudentChanges, StudentStatus, StudentStore,
};
use matricula::store::StoreError;
use rusqlite::{Row, ToSql};

use super::Database;

pub struct SqliteStudentStore {
    db: Database,
}

impl SqliteStudentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const COLUMNS: &str =
    "id, nombre, dni, fecha_nacimiento, genero, grado_actual, direccion, estado, fecha_ingreso";

pub(crate) fn row_to_student(row: &Row<'_>) -> rusqlite::Result<Student> {
    let genero: String = row.get(4)?;
    let estado: String = row.get(7)?;
    Ok(Student {
        id: row.get(0)?,
        nombre: row.get(1)?,
        dni: row.get(2)?,
        fecha_nacimiento: row.get(3)?,
        genero: Sex::parse(&genero).unwrap_or(Sex::Male),
        grado_actual: row.get(5)?,
        direccion: row.get(6)?,
        estado: StudentStatus::parse(&estado).unwrap_or(StudentStatus::Inactive),
        fecha_ingreso: row.get(8)?,
    })
}

impl StudentStore for SqliteStudentStore {
    fn insert(&self, record: NewStudentRecord) -> Result<Student, StoreError> {
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO estudiantes(nombre, dni, fecha_nacimiento, genero, grado_actual, direccion, estado, fecha_ingreso)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    record.nombre,
                    record.dni,
                    record.fecha_nacimiento,
                    record.genero.label(),
                    record.grado_actual,
                    record.direccion,
                    record.estado.label(),
                    record.fecha_ingreso,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM estudiantes WHERE id = ?1"),
                [id],
                row_to_student,
            )
        })
    }

    fn fetch(&self, id: i64) -> Result<Option<Student>, StoreError> {
        self.db.with(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM estudiantes WHERE id = ?1"))?;
            let mut rows = stmt.query_map([id], row_to_student)?;
            rows.next().transpose()
        })
    }

    fn fetch_by_dni(&self, dni: &str) -> Result<Option<Student>, StoreError> {
        self.db.with(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM estudiantes WHERE dni = ?1"))?;
            let mut rows = stmt.query_map([dni], row_to_student)?;
            rows.next().transpose()
        })
    }

    fn list(&self) -> Result<Vec<Student>, StoreError> {
        self.db.with(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM estudiantes ORDER BY id"))?;
            let rows = stmt.query_map([], row_to_student)?;
            rows.collect()
        })
    }

    fn update(&self, id: i64, changes: &StudentChanges) -> Result<usize, StoreError> {
        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(v) = &changes.nombre {
            sets.push("nombre = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &changes.dni {
            sets.push("dni = ?");
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
        if let Some(v) = changes.grado_actual {
            sets.push("grado_actual = ?");
            params.push(Box::new(v));
        }
        if let Some(v) = &changes.direccion {
            sets.push("direccion = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = changes.estado {
            sets.push("estado = ?");
            params.push(Box::new(v.label()));
        }

        if sets.is_empty() {
            return Ok(0);
        }
        params.push(Box::new(id));

        let sql = format!("UPDATE estudiantes SET {} WHERE id = ?", sets.join(", "));
        self.db.with(|conn| {
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, refs.as_slice())
        })
    }

    fn delete(&self, id: i64) -> Result<usize, StoreError> {
        self.db
            .with(|conn| conn.execute("DELETE FROM estudiantes WHERE id = ?1", [id]))
    }
}
