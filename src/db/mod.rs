use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use log::info;

use crate::config::Config;

pub mod models;
pub mod repositories;

pub async fn init_db_pool(config: &Config) -> Result<PgPool> {
    info!(
        "Initializing database connection pool with max_connections={}",
        config.db_max_connections
    );

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")
}

/// Health probe used by `GET /health`.
pub async fn check_database_health(pool: &PgPool) -> Result<bool> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| true)
        .context("Failed to connect to database")
}
