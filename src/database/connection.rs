//! Postgres pool setup, migrations and liveness

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::utils::errors::PoolMateError;

pub type DatabasePool = Pool<Postgres>;

const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Pool options for the configured bounds.
///
/// Waiting for a free connection is capped by `lock_wait_secs`, the same
/// bound the assignment transaction applies to row locks.
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.lock_wait_secs))
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
}

/// Connect to the configured database and check it answers
pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool, PoolMateError> {
    let pool = pool_options(config).connect(&config.url).await?;
    health_check(&pool).await?;

    info!(max_connections = config.max_connections, "Database pool ready");
    Ok(pool)
}

/// Apply the migrations under `migrations/`
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), PoolMateError> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

pub async fn health_check(pool: &DatabasePool) -> Result<(), PoolMateError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
