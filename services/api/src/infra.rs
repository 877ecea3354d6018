use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use matricula::documents::{FileStore, FileStoreError, StoredFile};
use metrics_exporter_prometheus::PrometheusHandle;
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Disk-backed upload storage. Stored names follow
/// `<field>-<millis>-<uuid>.<ext>` so concurrent uploads of the same
/// file never collide.
pub struct DiskFileStore {
    dir: PathBuf,
}

impl DiskFileStore {
    pub fn new(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileStore for DiskFileStore {
    fn save(
        &self,
        field: &str,
        original_name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, FileStoreError> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let stored_name = format!(
            "{field}-{}-{}{extension}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );

        std::fs::write(self.dir.join(&stored_name), bytes)
            .map_err(|err| FileStoreError::Io(err.to_string()))?;

        Ok(StoredFile {
            nombre_original: original_name.to_string(),
            nombre_almacenado: stored_name.clone(),
            ruta: format!("/uploads/{stored_name}"),
            size: bytes.len() as u64,
            mime: mime.to_string(),
        })
    }

    fn remove(&self, stored_name: &str) -> Result<(), FileStoreError> {
        std::fs::remove_file(self.dir.join(stored_name))
            .map_err(|err| FileStoreError::Io(err.to_string()))
    }
}
