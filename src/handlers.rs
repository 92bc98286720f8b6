pub mod auth;
pub mod health;
pub mod home;
pub mod messages;
pub mod users;

use axum::response::{Html, IntoResponse};
use axum::http::StatusCode;
use serde::Deserialize;
use validator::ValidationErrors;

use crate::error::{AppError, NOT_FOUND_PAGE};

/// Body of forms that carry nothing but the CSRF token
#[derive(Debug, Default, Deserialize)]
pub struct CsrfForm {
    pub csrf_token: Option<String>,
}

/// Parses a path id; anything that is not a valid id is treated as missing.
pub fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>().map_err(|_| AppError::NotFound)
}

/// Flattens validator output into sorted, human readable messages.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|field_errors| field_errors.iter())
        .map(|error| match &error.message {
            Some(message) => message.to_string(),
            None => format!("Invalid value ({})", error.code),
        })
        .collect();
    messages.sort();
    messages
}

/// Fallback for every unmatched route
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").ok(), Some(42));
        assert!(matches!(parse_id("9999999999"), Err(AppError::NotFound)));
        assert!(matches!(parse_id("abc"), Err(AppError::NotFound)));
    }
}
