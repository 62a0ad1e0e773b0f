use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Development-only key so a fresh checkout can start without secrets.
const DEVELOPMENT_KEY_HEX: &str =
    "6d6f7369702d707265726567697374726174696f6e2d6465762d6b65792d3030";

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub demographic: DemographicConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            demographic: DemographicConfig::load(environment)?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// AES-256 key material. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn from_hex(raw: &str) -> Result<Self, ConfigError> {
        let bytes = hex::decode(raw.trim()).map_err(|_| ConfigError::InvalidEncryptionKey)?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ConfigError::InvalidEncryptionKey)?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Demographic service wiring: collaborator endpoints, paging, crypto, identity files.
#[derive(Debug, Clone)]
pub struct DemographicConfig {
    pub version: String,
    pub page_size: usize,
    pub booking_url: String,
    pub document_url: String,
    pub remote_timeout: Duration,
    pub encryption_key: EncryptionKey,
    pub identity_mapping_path: Option<PathBuf>,
    pub identity_schema_path: Option<PathBuf>,
}

impl DemographicConfig {
    fn load(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let version = env::var("PREREG_VERSION").unwrap_or_else(|_| "1.0".to_string());

        let page_size = env::var("PREREG_PAGE_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<usize>()
            .ok()
            .filter(|size| *size > 0)
            .ok_or(ConfigError::InvalidPageSize)?;

        let booking_url = env::var("PREREG_BOOKING_URL")
            .unwrap_or_else(|_| "http://localhost:9095/preregistration/v1".to_string());
        let document_url = env::var("PREREG_DOCUMENT_URL")
            .unwrap_or_else(|_| "http://localhost:9092/preregistration/v1".to_string());

        let timeout_secs = env::var("PREREG_REMOTE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let encryption_key = match env::var("PREREG_ENCRYPTION_KEY") {
            Ok(raw) => EncryptionKey::from_hex(&raw)?,
            Err(_) if environment == AppEnvironment::Development => {
                EncryptionKey::from_hex(DEVELOPMENT_KEY_HEX)?
            }
            Err(_) => return Err(ConfigError::MissingEncryptionKey),
        };

        Ok(Self {
            version,
            page_size,
            booking_url,
            document_url,
            remote_timeout: Duration::from_secs(timeout_secs),
            encryption_key,
            identity_mapping_path: env::var_os("PREREG_IDENTITY_MAPPING").map(PathBuf::from),
            identity_schema_path: env::var_os("PREREG_IDENTITY_SCHEMA").map(PathBuf::from),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPageSize,
    InvalidTimeout,
    MissingEncryptionKey,
    InvalidEncryptionKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPageSize => {
                write!(f, "PREREG_PAGE_SIZE must be a positive integer")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "PREREG_REMOTE_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::MissingEncryptionKey => {
                write!(f, "PREREG_ENCRYPTION_KEY is required outside development")
            }
            ConfigError::InvalidEncryptionKey => {
                write!(f, "PREREG_ENCRYPTION_KEY must be 64 hex characters")
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
