//! Connection pool and schema setup

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::config::{
    env_or, DatabaseConfig, DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS, DEFAULT_DATABASE_MAX_CONNECTIONS,
    DEFAULT_DATABASE_MIN_CONNECTIONS,
};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database configuration error: {0}. Check DATABASE_URL and connection settings.")]
    Config(String),

    #[error("Failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type DbResult<T> = Result<T, DbError>;

/// Pool settings; lifetimes left as `None` are unlimited
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
}

impl From<&DatabaseConfig> for DbConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: Some(config.idle_timeout_secs),
            max_lifetime_secs: None,
        }
    }
}

impl DbConfig {
    /// Pool settings for tools that only need the database
    ///
    /// Unlike [`crate::config::Config::load`], `DATABASE_URL` is mandatory here.
    pub fn from_env() -> DbResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::Config("DATABASE_URL not set".to_string()))?;

        Ok(Self {
            url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS),
            connect_timeout_secs: env_or("DATABASE_CONNECT_TIMEOUT", DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            idle_timeout_secs: std::env::var("DATABASE_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
            max_lifetime_secs: None,
        })
    }
}

pub async fn create_pool(config: &DbConfig) -> DbResult<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(config.idle_timeout_secs.map(Duration::from_secs))
        .max_lifetime(config.max_lifetime_secs.map(Duration::from_secs));

    let pool = options.connect(&config.url).await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Apply the bundled migrations
pub async fn migrate(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Round-trip a trivial query
pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_from_database_config() {
        let config = DbConfig::from(&crate::config::Config::default().database);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.idle_timeout_secs, Some(600));
        assert_eq!(config.max_lifetime_secs, None);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("DATABASE_URL", "postgresql://localhost/test");
        std::env::set_var("DATABASE_MAX_CONNECTIONS", "15");

        let config = DbConfig::from_env();

        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("DATABASE_MAX_CONNECTIONS");

        let config = config.unwrap();
        assert_eq!(config.max_connections, 15);
        assert_eq!(config.min_connections, 2);
        assert!(config.url.contains("localhost/test"));
    }

    #[test]
    #[serial]
    fn test_config_from_env_missing_url() {
        std::env::remove_var("DATABASE_URL");
        assert!(matches!(DbConfig::from_env(), Err(DbError::Config(_))));
    }
}
