use matricula::school_years::{
    NewSchoolYearRecord, SchoolYear, SchoolYearChanges, SchoolYearStatus, SchoolYearStore,
};
use matricula::store::StoreError;
use rusqlite::{Row, ToSql};

use super::Database;

pub struct SqliteSchoolYearStore {
    db: Database,
}

impl SqliteSchoolYearStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const COLUMNS: &str = "id, anio, descripcion, fecha_inicio, fecha_fin, estado";

fn row_to_year(row: &Row<'_>) -> rusqlite::Result<SchoolYear> {
    let estado: String = row.get(5)?;
    Ok(SchoolYear {
        id: row.get(0)?,
        anio: row.get(1)?,
        descripcion: row.get(2)?,
        fecha_inicio: row.get(3)?,
        fecha_fin: row.get(4)?,
        estado: SchoolYearStatus::parse(&estado).unwrap_or(SchoolYearStatus::Planned),
    })
}

impl SchoolYearStore for SqliteSchoolYearStore {
    fn insert(&self, record: NewSchoolYearRecord) -> Result<SchoolYear, StoreError> {
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO anios_escolares(anio, descripcion, fecha_inicio, fecha_fin, estado)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    record.anio,
                    record.descripcion,
                    record.fecha_inicio,
                    record.fecha_fin,
                    record.estado.label(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM anios_escolares WHERE id = ?1"),
                [id],
                row_to_year,
            )
        })
    }

    fn fetch(&self, id: i64) -> Result<Option<SchoolYear>, StoreError> {
        self.db.with(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM anios_escolares WHERE id = ?1"))?;
            let mut rows = stmt.query_map([id], row_to_year)?;
            rows.next().transpose()
        })
    }

    fn fetch_by_year(&self, anio: &str) -> Result<Option<SchoolYear>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM anios_escolares WHERE anio = ?1"
            ))?;
            let mut rows = stmt.query_map([anio], row_to_year)?;
            rows.next().transpose()
        })
    }

    fn active(&self) -> Result<Option<SchoolYear>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM anios_escolares WHERE estado = 'activo' LIMIT 1"
            ))?;
            let mut rows = stmt.query_map([], row_to_year)?;
            rows.next().transpose()
        })
    }

    fn list(&self) -> Result<Vec<SchoolYear>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM anios_escolares ORDER BY anio"
            ))?;
            let rows = stmt.query_map([], row_to_year)?;
            rows.collect()
        })
    }

    fn update(&self, id: i64, changes: &SchoolYearChanges) -> Result<usize, StoreError> {
        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(v) = &changes.anio {
            sets.push("anio = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &changes.descripcion {
            sets.push("descripcion = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = changes.fecha_inicio {
            sets.push("fecha_inicio = ?");
            params.push(Box::new(v));
        }
        if let Some(v) = changes.fecha_fin {
            sets.push("fecha_fin = ?");
            params.push(Box::new(v));
        }
        if let Some(v) = changes.estado {
            sets.push("estado = ?");
            params.push(Box::new(v.label()));
        }

        if sets.is_empty() {
            return Ok(0);
        }
        params.push(Box::new(id));

        let sql = format!("UPDATE anios_escolares SET {} WHERE id = ?", sets.join(", "));
        self.db.with(|conn| {
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, refs.as_slice())
        })
    }

    fn delete(&self, id: i64) -> Result<usize, StoreError> {
        self.db
            .with(|conn| conn.execute("DELETE FROM anios_escolares WHERE id = ?1", [id]))
    }
}
