//! Per-request view of who is asking.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use model::entities::user;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::schemas::AppState;
use crate::session::{FlashLevel, Session};

pub const UNAUTHORIZED_FLASH: &str = "Access unauthorized.";

/// The session plus the logged-in user, if the session points at one that
/// still exists.
#[derive(Clone)]
pub struct RequestContext {
    pub session: Session,
    pub user: Option<user::Model>,
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer is not installed".to_string()))?;

        let user = match session.current_user_id().await {
            Some(user_id) => {
                let found = model::users::find(&state.db, user_id).await?;
                if found.is_none() {
                    debug!("Session refers to missing user ID: {}", user_id);
                    session.logout().await;
                }
                found
            }
            None => None,
        };

        Ok(Self { session, user })
    }
}

impl RequestContext {
    pub fn user_id(&self) -> Option<i32> {
        self.user.as_ref().map(|u| u.id)
    }

    /// The logged-in user, or an unauthorized flash and a redirect home.
    pub async fn require_user(&self) -> Result<&user::Model, AppError> {
        match &self.user {
            Some(user_model) => Ok(user_model),
            None => {
                self.session.flash(FlashLevel::Danger, UNAUTHORIZED_FLASH).await;
                Err(AppError::Unauthorized)
            }
        }
    }

    /// Checks a submitted form token against the session's token.
    pub async fn verify_csrf(&self, state: &AppState, submitted: Option<&str>) -> Result<(), AppError> {
        if !state.config.csrf_enabled {
            return Ok(());
        }

        let expected = self.session.data().await.csrf_token;
        match (expected, submitted) {
            (Some(expected), Some(submitted)) if tokens_match(&expected, submitted) => Ok(()),
            _ => {
                warn!("Rejected form submission with an invalid CSRF token");
                Err(AppError::BadRequest("Invalid CSRF token".to_string()))
            }
        }
    }
}

/// Compares two tokens in time independent of where they differ.
fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}
