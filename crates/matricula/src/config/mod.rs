use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Which observation-category enumeration the API accepts.
///
/// The product carries two historical sets; until that is settled the
/// active one is chosen at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObservationCategories {
    /// comentario, rechazo, aprobación, petición_documentos
    #[default]
    Workflow,
    /// ADMINISTRATIVA, ACADEMICA, DOCUMENTACION, OTRO
    Administrativa,
}

impl ObservationCategories {
    pub fn allowed(self) -> &'static [&'static str] {
        match self {
            Self::Workflow => &["comentario", "rechazo", "aprobación", "petición_documentos"],
            Self::Administrativa => &["ADMINISTRATIVA", "ACADEMICA", "DOCUMENTACION", "OTRO"],
        }
    }

    pub fn accepts(self, category: &str) -> bool {
        self.allowed().contains(&category)
    }

    fn from_env(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "workflow" => Ok(Self::Workflow),
            "administrativa" | "administrative" => Ok(Self::Administrativa),
            other => Err(ConfigError::InvalidObservationCategories {
                value: other.to_string(),
            }),
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database_path: PathBuf,
    pub uploads: UploadConfig,
    pub observation_categories: ObservationCategories,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_path = env::var("APP_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("matricula.sqlite3"));

        let uploads_dir = env::var("APP_UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public/uploads"));
        let max_upload_bytes = env::var("APP_MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| UploadConfig::DEFAULT_MAX_BYTES.to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidMaxUploadBytes)?;

        let observation_categories = match env::var("APP_OBSERVATION_CATEGORIES") {
            Ok(value) => ObservationCategories::from_env(&value)?,
            Err(_) => ObservationCategories::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database_path,
            uploads: UploadConfig {
                dir: uploads_dir,
                max_bytes: max_upload_bytes,
            },
            observation_categories,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where uploaded documents land and how large they may be.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

impl UploadConfig {
    pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidMaxUploadBytes,
    InvalidObservationCategories { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMaxUploadBytes => {
                write!(f, "APP_MAX_UPLOAD_BYTES must be a byte count")
            }
            ConfigError::InvalidObservationCategories { value } => {
                write!(
                    f,
                    "APP_OBSERVATION_CATEGORIES must be 'workflow' or 'administrativa', got '{value}'"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
