use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use matricula::config::{AppConfig, ObservationCategories};
use matricula::directory::guardians::{guardian_router, GuardianDirectory, GuardianStore};
use matricula::directory::links::{link_router, LinkService, LinkStore};
use matricula::directory::students::{student_router, StudentDirectory, StudentStore};
use matricula::documents::{document_router, AttachmentService, AttachmentStore, FileStore};
use matricula::enrollment::{matricula_router, request_router, EnrollmentService};
use matricula::error::AppError;
use matricula::observations::{observation_router, ObservationService, ObservationStore};
use matricula::school_years::{school_year_router, SchoolYearRegistry, SchoolYearStore};
use matricula::telemetry;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{AppState, DiskFileStore};
use crate::routes::{ops_router, uploads_router};
use crate::store::{
    Database, SqliteAttachmentStore, SqliteGuardianStore, SqliteLinkStore, SqliteNewRequestStore,
    SqliteObservationStore, SqlitePromotionRequestStore, SqliteSchoolYearStore, SqliteStudentStore,
    SqliteTransferRequestStore,
};

/// Every resource router over one database handle. The service crate's
/// integration tests build their app through here as well.
pub fn build_api_router(
    db: Database,
    files: Arc<dyn FileStore>,
    max_upload_bytes: usize,
    categories: ObservationCategories,
) -> Router {
    let students: Arc<dyn StudentStore> = Arc::new(SqliteStudentStore::new(db.clone()));
    let guardians: Arc<dyn GuardianStore> = Arc::new(SqliteGuardianStore::new(db.clone()));
    let links: Arc<dyn LinkStore> = Arc::new(SqliteLinkStore::new(db.clone()));
    let years: Arc<dyn SchoolYearStore> = Arc::new(SqliteSchoolYearStore::new(db.clone()));
    let new_requests = Arc::new(SqliteNewRequestStore::new(db.clone()));
    let transfers = Arc::new(SqliteTransferRequestStore::new(db.clone()));
    let promotions = Arc::new(SqlitePromotionRequestStore::new(db.clone()));
    let attachments: Arc<dyn AttachmentStore> = Arc::new(SqliteAttachmentStore::new(db.clone()));
    let observations: Arc<dyn ObservationStore> = Arc::new(SqliteObservationStore::new(db));

    let student_directory = Arc::new(StudentDirectory::new(students.clone()));
    let guardian_directory = Arc::new(GuardianDirectory::new(guardians.clone()));
    let link_service = Arc::new(LinkService::new(links, students.clone(), guardians));
    let year_registry = Arc::new(SchoolYearRegistry::new(years));
    let enrollment = Arc::new(EnrollmentService::new(
        new_requests,
        transfers,
        promotions,
        students,
    ));
    let attachment_service = Arc::new(AttachmentService::new(attachments, files, max_upload_bytes));
    let observation_service = Arc::new(ObservationService::new(observations, categories));

    student_router(student_directory)
        .merge(guardian_router(guardian_directory))
        .merge(link_router(link_service))
        .merge(school_year_router(year_registry))
        .merge(request_router(enrollment.clone()))
        .merge(matricula_router(enrollment))
        .merge(document_router(attachment_service))
        .merge(observation_router(observation_service))
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db = Database::open(&config.database_path)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;

    let files = Arc::new(DiskFileStore::new(&config.uploads.dir)?);
    let uploads_dir = files.dir().to_path_buf();

    let app = build_api_router(
        db,
        files,
        config.uploads.max_bytes,
        config.observation_categories,
    )
    .merge(ops_router())
    .merge(uploads_router(uploads_dir))
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "enrollment administration service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
