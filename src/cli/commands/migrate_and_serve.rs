use anyhow::Result;
use sea_orm::Database;
use tracing::{debug, error, info, trace};

use crate::config::{AppConfig, redact_database_url};
use super::initdb::run_migrations;
use super::serve::serve_with_connection;

pub async fn migrate_and_serve(config: AppConfig) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");
    debug!("Database URL: {}", redact_database_url(&config.database_url));
    debug!("Bind address: {}", config.bind_address);

    let db = match Database::connect(&config.database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            connection
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", redact_database_url(&config.database_url), e);
            return Err(e.into());
        }
    };

    run_migrations(&db).await?;
    serve_with_connection(db, config).await
}
