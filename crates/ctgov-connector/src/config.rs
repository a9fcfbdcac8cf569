//! Connection configuration and pool construction, including the
//! auto-create-database-if-missing fallback used for local/CI runs where the
//! target database hasn't been provisioned yet.

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, Pool, Postgres};

use crate::error::ConnectorError;

pub struct ConnectorConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl ConnectorConfig {
    pub fn from_env() -> Result<Self, ConnectorError> {
        let url = std::env::var("DATABASE_URL").map_err(|_| ConnectorError::Unknown("DATABASE_URL not set".to_string()))?;
        let min_connections = std::env::var("DATABASE_MIN_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(2);
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(10);
        Ok(Self { url, min_connections, max_connections })
    }
}

pub async fn build_pool(config: &ConnectorConfig) -> Result<Pool<Postgres>, ConnectorError> {
    match PgPoolOptions::new().min_connections(config.min_connections).max_connections(config.max_connections).connect(&config.url).await {
        Ok(pool) => Ok(pool),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("3D000") => {
            log::warn!("target database not found, attempting to create it");
            ensure_database_exists(&config.url).await?;
            PgPoolOptions::new()
                .min_connections(config.min_connections)
                .max_connections(config.max_connections)
                .connect(&config.url)
                .await
                .map_err(ConnectorError::from)
        }
        Err(e) => Err(e.into()),
    }
}

/// Connects to the `postgres` maintenance database and issues `CREATE
/// DATABASE` for the name parsed out of `full_url`. Best-effort: refuses to
/// touch names containing characters outside `[A-Za-z0-9_-]`.
async fn ensure_database_exists(full_url: &str) -> Result<(), ConnectorError> {
    let Some(pos) = full_url.rfind('/') else { return Ok(()) };
    let (base, tail) = full_url.split_at(pos);
    let db_part = &tail[1..];
    let db_name = db_part.split('?').next().unwrap_or(db_part);
    if db_name.is_empty() {
        return Ok(());
    }

    let admin_url = if base.ends_with("/postgres") || db_name == "postgres" { full_url.to_string() } else { format!("{base}/postgres") };
    let admin_pool = PgPoolOptions::new().max_connections(1).connect(&admin_url).await?;

    let exists: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pg_database WHERE datname = $1").bind(db_name).fetch_one(&admin_pool).await?;
    if exists.0 == 0 {
        if db_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            let create_stmt = format!("CREATE DATABASE \"{}\"", db_name.replace('"', ""));
            admin_pool.execute(create_stmt.as_str()).await?;
            log::info!("database '{db_name}' created automatically");
        } else {
            log::warn!("refusing to auto-create database with unsafe name: {db_name}");
        }
    }
    Ok(())
}
