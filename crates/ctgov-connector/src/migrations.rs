//! Applies pending `*.sql` files from a migrations directory, tracked in
//! `schema_migrations`. Each file is applied inside one transaction; a naive
//! `;`-split is used since migrations here are plain DDL with no embedded
//! semicolons in string literals or function bodies.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sqlx::{Executor, Pool, Postgres};

use crate::error::ConnectorError;

pub async fn run_migrations(pool: &Pool<Postgres>, migrations_dir: &str) -> Result<usize, ConnectorError> {
    let migrations_path = Path::new(migrations_dir);
    if !migrations_path.exists() {
        log::warn!("migrations directory '{migrations_dir}' not found, skipping");
        return Ok(0);
    }

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let mut files: Vec<PathBuf> = std::fs::read_dir(migrations_path)
        .map_err(|e| ConnectorError::Migration(e.to_string()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map(|e| e == "sql").unwrap_or(false))
        .collect();
    files.sort();

    let mut applied = 0;
    for file in files {
        let version = file.file_name().unwrap().to_string_lossy().to_string();
        let already: Option<(String,)> = sqlx::query_as("SELECT version FROM schema_migrations WHERE version = $1").bind(&version).fetch_optional(pool).await?;
        if already.is_some() {
            continue;
        }

        let sql = std::fs::read_to_string(&file).map_err(|e| ConnectorError::Migration(e.to_string()))?;
        if sql.trim().is_empty() {
            continue;
        }

        log::info!("applying migration {version}");
        let mut tx = pool.begin().await?;
        for statement in sql.split(';') {
            let stmt = statement.trim();
            if stmt.is_empty() {
                continue;
            }
            tx.execute(sqlx::query(stmt)).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES ($1, $2)").bind(&version).bind(Utc::now()).execute(&mut *tx).await?;
        tx.commit().await?;
        applied += 1;
    }

    if applied == 0 {
        log::info!("no pending migrations");
    }
    Ok(applied)
}
