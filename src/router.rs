use crate::handlers::{
    auth::{login, login_form, logout, signup, signup_form},
    health::health_check,
    home::homepage,
    messages::{create_message, delete_message, new_message_form, show_message},
    not_found,
    users::{
        delete_user, edit_profile, follow_user, list_users, show_followers, show_following,
        show_user, stop_following, update_profile,
    },
};
use crate::schemas::{ApiDoc, AppState};
use crate::session::session_layer;
use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;

/// Directory served under `/static`
pub const STATIC_DIR: &str = "static";

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check and API docs
        .route("/health", get(health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        // Home and authentication
        .route("/", get(homepage))
        .route("/signup", get(signup_form).post(signup))
        .route("/login", get(login_form).post(login))
        .route("/logout", post(logout))
        // Users
        .route("/users", get(list_users))
        .route("/users/profile", get(edit_profile).post(update_profile))
        .route("/users/delete", post(delete_user))
        .route("/users/follow/:user_id", post(follow_user))
        .route("/users/stop-following/:user_id", post(stop_following))
        .route("/users/:user_id", get(show_user))
        .route("/users/:user_id/following", get(show_following))
        .route("/users/:user_id/followers", get(show_followers))
        // Messages
        .route("/messages/new", get(new_message_form).post(create_message))
        .route("/messages/:message_id", get(show_message))
        .route("/messages/:message_id/delete", post(delete_message))
        // Static assets
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), session_layer))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30))),
        )
        .with_state(state)
}
