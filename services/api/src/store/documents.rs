use matricula::documents::domain::{Attachment, AttachmentChanges, AttachmentDraft, AttachmentFilter};
use matricula::documents::AttachmentStore;
use matricula::enrollment::domain::{RequestKind, RequestRef};
use matricula::store::StoreError;
use rusqlite::{Row, ToSql};

use super::Database;

pub struct SqliteAttachmentStore {
    db: Database,
}

impl SqliteAttachmentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const COLUMNS: &str =
    "id, tipo_solicitud, solicitud_id, tipo_documento, nombre_archivo, ruta_archivo, created_at";

fn row_to_attachment(row: &Row<'_>) -> rusqlite::Result<Attachment> {
    let kind: String = row.get(1)?;
    Ok(Attachment {
        id: row.get(0)?,
        tipo_solicitud: RequestKind::parse(&kind).unwrap_or(RequestKind::New),
        solicitud_id: row.get(2)?,
        tipo_documento: row.get(3)?,
        nombre_archivo: row.get(4)?,
        ruta_archivo: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl AttachmentStore for SqliteAttachmentStore {
    fn insert(&self, draft: AttachmentDraft) -> Result<Attachment, StoreError> {
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO documentos(tipo_solicitud, solicitud_id, tipo_documento, nombre_archivo, ruta_archivo)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    draft.tipo_solicitud.label(),
                    draft.solicitud_id,
                    draft.tipo_documento,
                    draft.nombre_archivo,
                    draft.ruta_archivo,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM documentos WHERE id = ?1"),
                [id],
                row_to_attachment,
            )
        })
    }

    fn fetch(&self, id: i64) -> Result<Option<Attachment>, StoreError> {
        self.db.with(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM documentos WHERE id = ?1"))?;
            let mut rows = stmt.query_map([id], row_to_attachment)?;
            rows.next().transpose()
        })
    }

    fn filtered(&self, filter: &AttachmentFilter) -> Result<Vec<Attachment>, StoreError> {
        let mut sql = format!("SELECT {COLUMNS} FROM documentos WHERE 1=1");
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(kind) = filter.tipo_solicitud {
            sql.push_str(" AND tipo_solicitud = ?");
            params.push(Box::new(kind.label()));
        }
        if let Some(id) = filter.solicitud_id {
            sql.push_str(" AND solicitud_id = ?");
            params.push(Box::new(id));
        }
        if let Some(tipo) = &filter.tipo_documento {
            sql.push_str(" AND tipo_documento = ?");
            params.push(Box::new(tipo.clone()));
        }
        sql.push_str(" ORDER BY id DESC");

        self.db.with(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt.query_map(refs.as_slice(), row_to_attachment)?;
            rows.collect()
        })
    }

    fn by_request(&self, reference: RequestRef) -> Result<Vec<Attachment>, StoreError> {
        self.filtered(&AttachmentFilter {
            tipo_solicitud: Some(reference.kind),
            solicitud_id: Some(reference.id),
            tipo_documento: None,
        })
    }

    fn by_student(&self, estudiante_id: i64) -> Result<Vec<Attachment>, StoreError> {
        // Asymmetric union: the promotion table carries the student FK
        // directly; the other two are joined through the denormalized
        // DNI column.
        let sql = format!(
            "SELECT {cols} FROM documentos d
             JOIN solicitud_siguiente_grado s
               ON d.solicitud_id = s.id AND d.tipo_solicitud = 'siguiente'
             WHERE s.estudiante_id = ?1
             UNION
             SELECT {cols} FROM documentos d
             JOIN solicitud_matricula_nueva sn
               ON d.solicitud_id = sn.id AND d.tipo_solicitud = 'nueva'
             JOIN estudiantes e ON e.dni = sn.dni_estudiante
             WHERE e.id = ?1
             UNION
             SELECT {cols} FROM documentos d
             JOIN solicitud_traslado st
               ON d.solicitud_id = st.id AND d.tipo_solicitud = 'traslado'
             JOIN estudiantes e ON e.dni = st.dni_estudiante
             WHERE e.id = ?1
             ORDER BY id DESC",
            cols = "d.id, d.tipo_solicitud, d.solicitud_id, d.tipo_documento, d.nombre_archivo, d.ruta_archivo, d.created_at"
        );
        self.db.with(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([estudiante_id], row_to_attachment)?;
            rows.collect()
        })
    }

    fn update(&self, id: i64, changes: &AttachmentChanges) -> Result<usize, StoreError> {
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
        if let Some(v) = &changes.tipo_documento {
            sets.push("tipo_documento = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &changes.nombre_archivo {
            sets.push("nombre_archivo = ?");
            params.push(Box::new(v.clone()));
        }
        if let Some(v) = &changes.ruta_archivo {
            sets.push("ruta_archivo = ?");
            params.push(Box::new(v.clone()));
        }

        if sets.is_empty() {
            return Ok(0);
        }
        params.push(Box::new(id));

        let sql = format!("UPDATE documentos SET {} WHERE id = ?", sets.join(", "));
        self.db.with(|conn| {
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, refs.as_slice())
        })
    }

    fn delete(&self, id: i64) -> Result<usize, StoreError> {
        self.db
            .with(|conn| conn.execute("DELETE FROM documentos WHERE id = ?1", [id]))
    }
}
