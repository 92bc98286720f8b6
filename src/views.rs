//! Page rendering: compiled templates and the view models they read.

use axum::response::Html;
use model::entities::{message, user};
use serde::Serialize;
use tera::{Context, Tera};
use tracing::trace;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::schemas::AppState;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("partials/csrf.html", include_str!("../templates/partials/csrf.html")),
    ("partials/errors.html", include_str!("../templates/partials/errors.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("home-anon.html", include_str!("../templates/home-anon.html")),
    ("messages/list.html", include_str!("../templates/messages/list.html")),
    ("messages/new.html", include_str!("../templates/messages/new.html")),
    ("messages/show.html", include_str!("../templates/messages/show.html")),
    ("users/signup.html", include_str!("../templates/users/signup.html")),
    ("users/login.html", include_str!("../templates/users/login.html")),
    ("users/index.html", include_str!("../templates/users/index.html")),
    ("users/detail.html", include_str!("../templates/users/detail.html")),
    ("users/show.html", include_str!("../templates/users/show.html")),
    ("users/following.html", include_str!("../templates/users/following.html")),
    ("users/followers.html", include_str!("../templates/users/followers.html")),
    ("users/edit.html", include_str!("../templates/users/edit.html")),
];

const TIMESTAMP_FORMAT: &str = "%d %B %Y";

/// Compiles every page template into one registry.
pub fn build_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())?;
    Ok(tera)
}

/// A user as pages show it; image urls already resolved to their defaults.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: String,
    pub location: String,
}

impl From<&user::Model> for UserView {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username.clone(),
            email: model.email.clone(),
            image_url: model.image_url_or_default().to_string(),
            header_image_url: model
                .header_image_url
                .clone()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| user::DEFAULT_HEADER_IMAGE_URL.to_string()),
            bio: model.bio.clone().unwrap_or_default(),
            location: model.location.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: i32,
    pub text: String,
    pub timestamp: String,
    pub author: UserView,
}

impl MessageView {
    pub fn new(message_model: &message::Model, author: &user::Model) -> Self {
        Self {
            id: message_model.id,
            text: message_model.text.clone(),
            timestamp: message_model.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            author: UserView::from(author),
        }
    }
}

/// Counters shown on profile and home cards.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProfileStats {
    pub messages: u64,
    pub following: u64,
    pub followers: u64,
}

impl ProfileStats {
    pub async fn load(state: &AppState, user_id: i32) -> Result<Self, AppError> {
        Ok(Self {
            messages: model::messages::count_for_user(&state.db, user_id).await?,
            following: model::follows::count_following(&state.db, user_id).await?,
            followers: model::follows::count_followers(&state.db, user_id).await?,
        })
    }
}

/// Renders `name` with the values every page layout needs.
///
/// Pending flashes are consumed here, so they show exactly once.
pub async fn render(
    state: &AppState,
    ctx: &RequestContext,
    name: &str,
    mut context: Context,
) -> Result<Html<String>, AppError> {
    trace!("Rendering template {}", name);

    context.insert("current_user", &ctx.user.as_ref().map(UserView::from));
    context.insert("flashes", &ctx.session.take_flashes().await);

    let csrf_token = if state.config.csrf_enabled {
        ctx.session.csrf_token().await
    } else {
        String::new()
    };
    context.insert("csrf_token", &csrf_token);

    if !context.contains_key("errors") {
        context.insert("errors", &Vec::<String>::new());
    }

    Ok(Html(state.templates.render(name, &context)?))
}
