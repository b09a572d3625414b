//! Shared test utilities for larder integration tests.
//!
//! Provides one PostgreSQL instance per test binary; every test gets its own
//! freshly migrated database inside it.
//!
//! - **`LARDER_TEST_PG_URL`** set: use that server directly (for CI jobs that
//!   start PostgreSQL themselves).
//! - **Unset**: start a container with testcontainers, shared per binary
//!   through a `OnceCell`.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use larder_db::pool;

struct SharedPg {
    base_url: String,
    /// Keeps the container alive. `None` when using an external URL.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var("LARDER_TEST_PG_URL") {
        return SharedPg {
            base_url: url.trim_end_matches('/').to_owned(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .expect("failed to start PostgreSQL container");

    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Server root URL of the shared PostgreSQL (no database name appended).
pub async fn pg_url() -> &'static str {
    let shared = SHARED_PG.get_or_init(init_shared_pg).await;
    &shared.base_url
}

async fn maintenance_pool() -> PgPool {
    let maint_url = format!("{}/postgres", pg_url().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&maint_url)
        .await
        .expect("failed to connect to maintenance database")
}

/// Create a temporary database with migrations applied.
///
/// Returns `(pool, db_name)`. Pass `db_name` to [`drop_test_db`] when the
/// test is done.
pub async fn create_test_db() -> (PgPool, String) {
    let maint_pool = maintenance_pool().await;

    let db_name = format!("larder_test_{}", Uuid::new_v4().simple());
    let stmt = format!("CREATE DATABASE {db_name}");
    maint_pool
        .execute(stmt.as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e}"));
    maint_pool.close().await;

    let temp_url = format!("{}/{db_name}", pg_url().await);
    let temp_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&temp_url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to temp database {db_name}: {e}"));

    pool::run_migrations(&temp_pool)
        .await
        .expect("migrations should succeed");

    (temp_pool, db_name)
}

/// Drop a temporary database, terminating any remaining connections.
pub async fn drop_test_db(db_name: &str) {
    let maint_pool = maintenance_pool().await;

    let terminate = format!(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = maint_pool.execute(terminate.as_str()).await;

    let stmt = format!("DROP DATABASE IF EXISTS {db_name}");
    let _ = maint_pool.execute(stmt.as_str()).await;
    maint_pool.close().await;
}

/// Insert a catalog recipe with sensible defaults for everything a test does
/// not care about.
pub async fn insert_recipe_fixture(
    pool: &PgPool,
    name: &str,
    cuisine: &str,
    tags: &[&str],
    calories: f64,
    protein_g: f64,
) -> larder_db::models::Recipe {
    use larder_db::models::Difficulty;
    use larder_db::queries::recipes::{NewRecipe, insert_recipe};

    let tags: Vec<String> = tags.iter().map(|t| (*t).to_owned()).collect();
    let new = NewRecipe {
        name,
        dietary_tags: &tags,
        cuisine,
        difficulty: Difficulty::Easy,
        prep_time_minutes: 15,
        cook_time_minutes: 20,
        servings: 2,
        calories,
        protein_g,
        carbs_g: 40.0,
        fat_g: 15.0,
        fiber_g: 5.0,
        sugar_g: 6.0,
        sodium_mg: 400.0,
    };
    insert_recipe(pool, &new)
        .await
        .unwrap_or_else(|e| panic!("failed to insert recipe fixture {name:?}: {e:#}"))
}
