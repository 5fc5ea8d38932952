//! Database bootstrap.
//!
//! Opens the PostgreSQL pool and applies the migrations in `migrations/`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::AppConfig;

/// Connect to the application database and bring its schema up to date.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to application database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Application migrations complete");

    Ok(pool)
}
