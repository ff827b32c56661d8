use std::path::PathBuf;

use shared::order::Coordinates;

use crate::auth::JwtConfig;
use crate::core::{Result, ServerError};

/// Default upload ceiling (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration
///
/// # Environment
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | HTTP_PORT | 3000 | HTTP listen port |
/// | ENVIRONMENT | development | development, staging or production |
/// | DATABASE_URL | (unset) | PostgreSQL URL; in-memory storage when unset |
/// | JWT_SECRET | generated in development | HMAC secret, at least 32 chars |
/// | JWT_EXPIRATION_MINUTES | 1440 | Token lifetime |
/// | UPLOAD_DIR | ./uploads | Document storage directory |
/// | PUBLIC_BASE_URL | http://localhost:3000 | Prefix of returned document URLs |
/// | MAX_UPLOAD_BYTES | 10485760 | Upload size ceiling |
/// | LOG_LEVEL | info | Default level when RUST_LOG is unset |
/// | LOG_DIR | (unset) | Daily rolling log files when the directory exists |
/// | ADMIN_EMAIL / ADMIN_PASSWORD | (unset) | Bootstrap admin account |
/// | GEOCODER_ORIGIN_LAT / GEOCODER_ORIGIN_LNG | 12.9716 / 77.5946 | Mock geocoder origin |
///
/// ```ignore
/// DATABASE_URL=postgres://localhost/pharmaflow HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub environment: String,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub geocoder_origin: Coordinates,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let jwt = JwtConfig::from_env(environment == "development")?;

        let http_port = env_parse("HTTP_PORT", 3000)?;
        let defaults = Self::development();

        Ok(Self {
            http_port,
            database_url: env_opt("DATABASE_URL"),
            jwt,
            upload_dir: env_opt("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            public_base_url: env_opt("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{http_port}")),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            log_level: env_opt("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: env_opt("LOG_DIR"),
            admin_email: env_opt("ADMIN_EMAIL"),
            admin_password: env_opt("ADMIN_PASSWORD"),
            geocoder_origin: Coordinates {
                lat: env_parse("GEOCODER_ORIGIN_LAT", defaults.geocoder_origin.lat)?,
                lng: env_parse("GEOCODER_ORIGIN_LNG", defaults.geocoder_origin.lng)?,
            },
            environment,
        })
    }

    /// Development defaults without reading the environment
    pub fn development() -> Self {
        Self {
            http_port: 3000,
            environment: "development".to_string(),
            database_url: None,
            jwt: JwtConfig::with_secret("development-secret-key-not-for-production-use"),
            upload_dir: PathBuf::from("./uploads"),
            public_base_url: "http://localhost:3000".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_level: "info".to_string(),
            log_dir: None,
            admin_email: None,
            admin_password: None,
            geocoder_origin: Coordinates {
                lat: 12.9716,
                lng: 77.5946,
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::development()
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional variable; a present but malformed value is an error
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env_opt(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ServerError::Config(format!("{name} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}
