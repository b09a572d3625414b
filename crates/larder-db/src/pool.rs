use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Schema for recipes, meal plans and planned meals, embedded from
/// `crates/larder-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Tables reported by [`table_counts`], in display order.
const TABLES: &[&str] = &["recipes", "meal_plans", "planned_meals"];

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))
}

/// Open the pool shared by the CLI commands and the HTTP server.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    connect(&config.database_url, 5).await
}

/// Bring the larder schema up to date.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to migrate the larder schema")?;

    info!(
        migrations = MIGRATOR.iter().count(),
        "larder schema is up to date"
    );
    Ok(())
}

/// Create the configured database through the `postgres` maintenance
/// database unless it is already there.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = config
        .database_name()
        .context("database URL does not name a database")?;
    // CREATE DATABASE takes an identifier, not a bind parameter.
    if !is_plain_identifier(db_name) {
        anyhow::bail!("refusing to create database {db_name:?}: not a plain identifier");
    }

    let admin = connect(&config.maintenance_url(), 1).await?;

    let found: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&admin)
            .await
            .context("failed to look up database in pg_database")?;

    if found {
        info!(db = db_name, "larder database present");
    } else {
        admin
            .execute(format!("CREATE DATABASE {db_name}").as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "larder database created");
    }

    admin.close().await;
    Ok(())
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Row count of each larder table, for the `larder db-init` report.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}"))?;
        counts.push(((*table).to_owned(), count));
    }
    Ok(counts)
}
