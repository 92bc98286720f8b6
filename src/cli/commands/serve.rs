use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, debug, trace, error};

use crate::config::{AppConfig, build_app_state, initialize_app_state};
use crate::router::create_router;
use crate::schemas::AppState;

pub async fn serve(config: AppConfig) -> Result<()> {
    trace!("Entering serve function");
    info!("Warbler starting up");

    let state = match initialize_app_state(config).await {
        Ok(state) => {
            debug!("Application state initialized successfully");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    run_server(state).await
}

/// Binds the configured address and serves the router until shutdown.
pub async fn run_server(state: AppState) -> Result<()> {
    let bind_address = state.config.bind_address.clone();
    let app = create_router(state);
    debug!("Router created successfully");

    info!("Starting server on {}", bind_address);
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => {
            debug!("Successfully bound to address: {}", bind_address);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", bind_address, e);
            return Err(e.into());
        }
    };

    info!("Warbler running on http://{}", bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}

/// Serves on an already open connection, e.g. one just migrated.
pub(crate) async fn serve_with_connection(db: sea_orm::DatabaseConnection, config: AppConfig) -> Result<()> {
    let state = build_app_state(db, config)?;
    run_server(state).await
}
