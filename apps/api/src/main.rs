//! Tessera API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tessera_core::AppError;
use tessera_infrastructure::{
    MIGRATOR, PostgresAuditRepository, PostgresCompanyRepository, PostgresDirectoryRepository,
    PostgresRecordRepository, PostgresSecurityRepository,
};
use tracing::info;

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::{AppState, Repositories};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let app_state = AppState::new(Repositories {
        directories: Arc::new(PostgresDirectoryRepository::new(pool.clone())),
        records: Arc::new(PostgresRecordRepository::new(pool.clone())),
        companies: Arc::new(PostgresCompanyRepository::new(pool.clone())),
        security: Arc::new(PostgresSecurityRepository::new(pool.clone())),
        audit: Arc::new(PostgresAuditRepository::new(pool)),
    });

    if let Some(user_id) = config.bootstrap_super_admin {
        app_state
            .permission_service
            .bootstrap_super_admin(user_id)
            .await?;
    }

    let app = api_router::build_router(app_state, config.frontend_url.as_deref())?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "tessera-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
