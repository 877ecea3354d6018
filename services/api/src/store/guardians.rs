use matricula::directory::guardians::{Guardian, GuardianChanges, GuardianStore, NewGuardianRecord};
use matricula::store::StoreError;
use rusqlite::{Row, ToSql};

use super::Database;

pub struct SqliteGuardianStore {
    db: Database,
}

impl SqliteGuardianStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const COLUMNS: &str =
    "id, nombre, dni, parentesco, ocupacion, grado_instruccion, telefono, email, direccion";

pub(crate) fn row_to_guardian(row: &Row<'_>) -> rusqlite::Result<Guardian> {
    Ok(Guardian {
        id: row.get(0)?,
        nombre: row.get(1)?,
        dni: row.get(2)?,
        parentesco: row.get(3)?,
        ocupacion: row.get(4)?,
        grado_instruccion: row.get(5)?,
        telefono: row.get(6)?,
        email: row.get(7)?,
        direccion: row.get(8)?,
    })
}

impl GuardianStore for SqliteGuardianStore {
    fn insert(&self, record: NewGuardianRecord) -> Result<Guardian, StoreError> {
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO apoderados(nombre, dni, parentesco, ocupacion, grado_instruccion, telefono, email, direccion)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    record.nombre,
                    record.dni,
                    record.parentesco,
                    record.ocupacion,
                    record.grado_instruccion,
                    record.telefono,
                    record.email,
                    record.direccion,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM apoderados WHERE id = ?1"),
                [id],
                row_to_guardian,
            )
        })
    }

    fn fetch(&self, id: i64) -> Result<Option<Guardian>, StoreError> {
        self.db.with(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM apoderados WHERE id = ?1"))?;
            let mut rows = stmt.query_map([id], row_to_guardian)?;
            rows.next().transpose()
        })
    }

    fn fetch_by_dni(&self, dni: &str) -> Result<Option<Guardian>, StoreError> {
        self.db.with(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM apoderados WHERE dni = ?1"))?;
            let mut rows = stmt.query_map([dni], row_to_guardian)?;
            rows.next().transpose()
        })
    }

    fn list(&self) -> Result<Vec<Guardian>, StoreError> {
        self.db.with(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM apoderados ORDER BY id"))?;
            let rows = stmt.query_map([], row_to_guardian)?;
            rows.collect()
        })
    }

    fn update(&self, id: i64, changes: &GuardianChanges) -> Result<usize, StoreError> {
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
        if let Some(v) = &changes.direccion {
            sets.push("direccion = ?");
            params.push(Box::new(v.clone()));
        }

        if sets.is_empty() {
            return Ok(0);
        }
        params.push(Box::new(id));

        let sql = format!("UPDATE apoderados SET {} WHERE id = ?", sets.join(", "));
        self.db.with(|conn| {
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, refs.as_slice())
        })
    }

    fn delete(&self, id: i64) -> Result<usize, StoreError> {
        self.db
            .with(|conn| conn.execute("DELETE FROM apoderados WHERE id = ?1", [id]))
    }
}
