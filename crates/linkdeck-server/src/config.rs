//! Server configuration
//!
//! Values come from the process environment (after `.env` is loaded) and fall
//! back to the `DEFAULT_*` constants. Unparseable values also fall back; only
//! [`Config::validate`] rejects a configuration.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ingest::IngestConfig;

pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 8000;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/linkdeck";
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Ten minutes
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Frontend dev server
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Staging directory for uploads awaiting ingestion
pub const DEFAULT_UPLOAD_FOLDER: &str = "uploads";

/// 100 MiB
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 100 * 1024 * 1024;

/// Parsed environment variable, or `default` when unset or malformed
pub(crate) fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub upload: UploadConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("LINKDECK_HOST", DEFAULT_SERVER_HOST.to_string()),
            port: env_or("LINKDECK_PORT", DEFAULT_SERVER_PORT),
            shutdown_timeout_secs: env_or("LINKDECK_SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    fn from_env() -> Self {
        Self {
            url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL.to_string()),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS),
            connect_timeout_secs: env_or("DATABASE_CONNECT_TIMEOUT", DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Empty or `*` allows any origin
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl CorsConfig {
    fn from_env() -> Self {
        let origins = env_or("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN.to_string());
        Self {
            allowed_origins: origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadConfig {
    /// Where uploads are staged until ingestion finishes
    pub dir: PathBuf,
    /// Largest accepted upload in bytes
    pub max_content_length: usize,
}

impl UploadConfig {
    fn from_env() -> Self {
        Self {
            dir: env_or("UPLOAD_FOLDER", PathBuf::from(DEFAULT_UPLOAD_FOLDER)),
            max_content_length: env_or("MAX_CONTENT_LENGTH", DEFAULT_MAX_CONTENT_LENGTH),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_UPLOAD_FOLDER),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl Config {
    /// Load `.env`, then the environment, then validate
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            cors: CorsConfig::from_env(),
            upload: UploadConfig::from_env(),
            ingest: IngestConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("LINKDECK_PORT must be greater than 0");
        }

        let db = &self.database;
        if db.url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL cannot be empty");
        }
        if db.max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be greater than 0");
        }
        if db.min_connections > db.max_connections {
            anyhow::bail!(
                "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                db.min_connections,
                db.max_connections
            );
        }

        if self.upload.max_content_length == 0 {
            anyhow::bail!("MAX_CONTENT_LENGTH must be greater than 0");
        }
        if self.upload.dir.as_os_str().is_empty() {
            anyhow::bail!("UPLOAD_FOLDER cannot be empty");
        }

        self.ingest.validate()?;

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; any origin is accepted");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            upload: UploadConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}
