use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use model::ModelError;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::error;

/// Static 404 page; always contains the apology text.
pub const NOT_FOUND_PAGE: &str = include_str!("../templates/404.html");
const SERVER_ERROR_PAGE: &str = include_str!("../templates/500.html");

/// Errors a handler can end with
#[derive(Error, Debug)]
pub enum AppError {
    /// The path did not resolve to an existing record
    #[error("Resource not found")]
    NotFound,

    /// No logged-in user; the flash has already been written to the session
    #[error("Access unauthorized")]
    Unauthorized,

    /// The request was malformed, e.g. a CSRF token mismatch
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Error from the model layer
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Error from template rendering
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    /// Runtime error for unexpected situations
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DbErr> for AppError {
    fn from(error: DbErr) -> Self {
        AppError::Model(ModelError::from(error))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response(),
            AppError::Unauthorized => Redirect::to("/").into_response(),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            other => {
                error!("Request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(SERVER_ERROR_PAGE)).into_response()
            }
        }
    }
}
