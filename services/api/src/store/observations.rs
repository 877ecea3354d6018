use matricula::enrollment::domain::{RequestKind, RequestRef};
use matricula::observations::{
    Observation, ObservationChanges, ObservationDraft, ObservationStore,
};
use matricula::store::StoreError;
use rusqlite::{Row, ToSql};

use super::Database;

pub struct SqliteObservationStore {
    db: Database,
}

impl SqliteObservationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const COLUMNS: &str =
    "id, tipo_solicitud, solicitud_id, fecha_creacion, tipo, descripcion, es_visible_para_padres";

fn row_to_observation(row: &Row<'_>) -> rusqlite::Result<Observation> {
    let kind: String = row.get(1)?;
    Ok(Observation {
        id: row.get(0)?,
        tipo_solicitud: RequestKind::parse(&kind).unwrap_or(RequestKind::New),
        solicitud_id: row.get(2)?,
        fecha_creacion: row.get(3)?,
        tipo: row.get(4)?,
        descripcion: row.get(5)?,
        es_visible_para_padres: row.get(6)?,
    })
}

impl ObservationStore for SqliteObservationStore {
    fn insert(&self, draft: ObservationDraft) -> Result<Observation, StoreError> {
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO observaciones(tipo_solicitud, solicitud_id, tipo, descripcion, es_visible_para_padres)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    draft.tipo_solicitud.label(),
                    draft.solicitud_id,
                    draft.tipo,
                    draft.descripcion,
                    draft.es_visible_para_padres,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM observaciones WHERE id = ?1"),
                [id],
                row_to_observation,
            )
        })
    }

    fn fetch(&self, id: i64) -> Result<Option<Observation>, StoreError> {
        self.db.with(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM observaciones WHERE id = ?1"))?;
            let mut rows = stmt.query_map([id], row_to_observation)?;
            rows.next().transpose()
        })
    }

    fn list(&self) -> Result<Vec<Observation>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM observaciones ORDER BY fecha_creacion DESC, id DESC"
            ))?;
            let rows = stmt.query_map([], row_to_observation)?;
            rows.collect()
        })
    }

    fn by_request(&self, reference: RequestRef) -> Result<Vec<Observation>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM observaciones
                 WHERE tipo_solicitud = ?1 AND solicitud_id = ?2
                 ORDER BY fecha_creacion DESC, id DESC"
            ))?;
            let rows = stmt.query_map(
                rusqlite::params![reference.kind.label(), reference.id],
                row_to_observation,
            )?;
            rows.collect()
        })
    }

    fn visible_by_request(&self, reference: RequestRef) -> Result<Vec<Observation>, StoreError> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM observaciones
                 WHERE tipo_solicitud = ?1 AND solicitud_id = ?2 AND es_visible_para_padres = 1
                 ORDER BY fecha_creacion DESC, id DESC"
            ))?;
            let rows = stmt.query_map(
                rusqlite::params![reference.kind.label(), reference.id],
                row_to_observation,
            )?;
            rows.collect()
        })
    }

    fn update(&self, id: i64, changes: &ObservationChanges) -> Result<usize, StoreError> {
        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(v) = changes.tipo_solicitud {
            sets.push("tipo_solicitud = ?");
            params.push(Box::new(v.label()));
        }
        if let Some(v) = changes.solicitud_id {
            sets.push("solicitud_id = ?");
            params.push(Box::new(v));
        }
        if let Some(v) = &changes.tipo {
            sets.push("tipo = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &changes.descripcion {
            sets.push("descripcion = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = changes.es_visible_para_padres {
            sets.push("es_visible_para_padres = ?");
            params.push(Box::new(v));
        }

        if sets.is_empty() {
            return Ok(0);
        }
        params.push(Box::new(id));

        let sql = format!("UPDATE observaciones SET {} WHERE id = ?", sets.join(", "));
        self.db.with(|conn| {
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, refs.as_slice())
        })
    }

    fn delete(&self, id: i64) -> Result<usize, StoreError> {
        self.db
            .with(|conn| conn.execute("DELETE FROM observaciones WHERE id = ?1", [id]))
    }
}
