use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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

const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub rendering: RenderingConfig,
    pub branding: BrandingConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let storage = StorageConfig {
            upload_dir: env_path("APP_UPLOAD_DIR", "uploads"),
            pdf_dir: env_path("APP_PDF_DIR", "pdfs"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        };

        let timeout_secs = match env::var("PDF_RENDER_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidRenderTimeout { value: raw })?,
            Err(_) => DEFAULT_RENDER_TIMEOUT_SECS,
        };

        let rendering = RenderingConfig {
            force_fallback: env::var("FORCE_FALLBACK_PDF")
                .map(|value| parse_flag(&value))
                .unwrap_or(false),
            chrome_executable: env::var("CHROME_EXECUTABLE_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            timeout: Duration::from_secs(timeout_secs),
        };

        let defaults = BrandingConfig::default();
        let mut logo_candidates = Vec::new();
        if let Some(explicit) = env::var("APP_LOGO_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            logo_candidates.push(PathBuf::from(explicit));
        }
        logo_candidates.extend(defaults.logo_candidates);

        let branding = BrandingConfig {
            institution_name: env::var("APP_INSTITUTION_NAME")
                .unwrap_or(defaults.institution_name),
            portal_name: env::var("APP_PORTAL_NAME").unwrap_or(defaults.portal_name),
            id_prefix: env::var("APP_ID_PREFIX").unwrap_or(defaults.id_prefix),
            logo_candidates,
        };

        let mail = MailConfig {
            admin_email: env::var("ADMIN_EMAIL")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            from: env::var("MAIL_FROM").unwrap_or_else(|_| "admissions@localhost".to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage,
            rendering,
            branding,
            mail,
        })
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
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

/// Where uploaded documents and generated PDFs live on disk.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub max_upload_bytes: u64,
}

/// Controls for the PDF rendering chain.
#[derive(Debug, Clone)]
pub struct RenderingConfig {
    /// Skip the HTML renderers and go straight to the synthetic PDF writer.
    pub force_fallback: bool,
    pub chrome_executable: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            force_fallback: false,
            chrome_executable: None,
            timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
        }
    }
}

/// Institution details stamped onto generated documents and identifiers.
#[derive(Debug, Clone)]
pub struct BrandingConfig {
    pub institution_name: String,
    pub portal_name: String,
    pub id_prefix: String,
    pub logo_candidates: Vec<PathBuf>,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            institution_name: "Hyderabad Law College".to_string(),
            portal_name: "Admission Portal".to_string(),
            id_prefix: "HLC".to_string(),
            logo_candidates: vec![
                PathBuf::from("public/logo.png"),
                PathBuf::from("public/assets/logo.png"),
                PathBuf::from("server/public/logo.png"),
            ],
        }
    }
}

/// Outbound notification addresses.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub admin_email: Option<String>,
    pub from: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRenderTimeout { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRenderTimeout { value } => write!(
                f,
                "PDF_RENDER_TIMEOUT_SECS must be a positive number of seconds (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidRenderTimeout { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
