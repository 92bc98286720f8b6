use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::Serialize;
use tera::Tera;
use utoipa::{OpenApi, ToSchema};

use crate::config::AppConfig;
use crate::session::SessionStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Server-side session storage
    pub sessions: SessionStore,
    /// Compiled page templates
    pub templates: Arc<Tera>,
    /// Configuration resolved at startup
    pub config: Arc<AppConfig>,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation for the machine-readable endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            HealthResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
    ),
    info(
        title = "Warbler",
        description = "Warbler social network - service endpoints",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
