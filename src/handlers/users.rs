use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_valid::Valid;
use model::entities::user;
use model::users::ProfileUpdate;
use serde::{Deserialize, Serialize};
use tera::Context;
use tracing::{debug, info, instrument, trace, warn};
use validator::Validate;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::handlers::{CsrfForm, parse_id};
use crate::schemas::AppState;
use crate::session::FlashLevel;
use crate::views::{MessageView, ProfileStats, UserView, render};

/// Query parameters for the user list
#[derive(Debug, Deserialize, Validate)]
pub struct UserSearchQuery {
    /// Substring of the username to look for
    #[validate(length(max = 50))]
    pub q: Option<String>,
}

/// Profile edit form; `password` confirms the change
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub header_image_url: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub csrf_token: Option<String>,
}

impl From<&user::Model> for ProfileForm {
    fn from(model: &user::Model) -> Self {
        Self {
            username: model.username.clone(),
            email: model.email.clone(),
            image_url: model.image_url.clone().unwrap_or_default(),
            header_image_url: model.header_image_url.clone().unwrap_or_default(),
            bio: model.bio.clone().unwrap_or_default(),
            location: model.location.clone().unwrap_or_default(),
            ..Default::default()
        }
    }
}

impl ProfileForm {
    fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            username: self.username.clone(),
            email: self.email.clone(),
            image_url: Some(self.image_url.clone()),
            header_image_url: Some(self.header_image_url.clone()),
            bio: Some(self.bio.clone()),
            location: Some(self.location.clone()),
        }
    }
}

async fn find_user(state: &AppState, raw_id: &str) -> Result<user::Model, AppError> {
    let user_id = parse_id(raw_id)?;
    model::users::find(&state.db, user_id).await?.ok_or_else(|| {
        debug!("User with ID {} not found", user_id);
        AppError::NotFound
    })
}

/// Shared context of the profile layout
async fn profile_context(state: &AppState, ctx: &RequestContext, user_model: &user::Model) -> Result<Context, AppError> {
    let is_following = match ctx.user_id() {
        Some(me) if me != user_model.id => model::follows::is_following(&state.db, me, user_model.id).await?,
        _ => false,
    };

    let mut context = Context::new();
    context.insert("user", &UserView::from(user_model));
    context.insert("stats", &ProfileStats::load(state, user_model.id).await?);
    context.insert("is_following", &is_following);
    Ok(context)
}

/// List users, optionally filtered by username
#[instrument(skip(state, ctx))]
pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
    Valid(Query(query)): Valid<Query<UserSearchQuery>>,
) -> Result<Html<String>, AppError> {
    trace!("Entering list_users function");
    let users = model::users::search(&state.db, query.q.as_deref()).await?;
    debug!("User search returned {} users", users.len());

    let users: Vec<UserView> = users.iter().map(UserView::from).collect();
    let mut context = Context::new();
    context.insert("users", &users);
    render(&state, &ctx, "users/index.html", context).await
}

/// Profile page with the user's messages
#[instrument(skip(state, ctx))]
pub async fn show_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let user_model = find_user(&state, &user_id).await?;

    let messages: Vec<MessageView> = model::messages::for_user(&state.db, user_model.id)
        .await?
        .iter()
        .map(|message_model| MessageView::new(message_model, &user_model))
        .collect();

    let mut context = profile_context(&state, &ctx, &user_model).await?;
    context.insert("messages", &messages);
    render(&state, &ctx, "users/show.html", context).await
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Following,
    Followers,
}

async fn show_connections(
    state: AppState,
    ctx: RequestContext,
    raw_id: String,
    direction: Direction,
) -> Result<Html<String>, AppError> {
    let me = ctx.require_user().await?.id;
    let user_model = find_user(&state, &raw_id).await?;

    let (users, template) = match direction {
        Direction::Following => (
            model::follows::following(&state.db, user_model.id).await?,
            "users/following.html",
        ),
        Direction::Followers => (
            model::follows::followers(&state.db, user_model.id).await?,
            "users/followers.html",
        ),
    };
    debug!("User {} has {} users in {:?}", user_model.id, users.len(), direction);

    let my_following_ids: Vec<i32> = model::follows::edges_from(&state.db, me)
        .await?
        .into_iter()
        .map(|edge| edge.user_being_followed_id)
        .collect();

    let users: Vec<UserView> = users.iter().map(UserView::from).collect();
    let mut context = profile_context(&state, &ctx, &user_model).await?;
    context.insert("users", &users);
    context.insert("my_following_ids", &my_following_ids);
    render(&state, &ctx, template, context).await
}

/// Users this user follows
#[instrument(skip(state, ctx))]
pub async fn show_following(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
) -> Result<Html<String>, AppError> {
    show_connections(state, ctx, user_id, Direction::Following).await
}

/// Users following this user
#[instrument(skip(state, ctx))]
pub async fn show_followers(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
) -> Result<Html<String>, AppError> {
    show_connections(state, ctx, user_id, Direction::Followers).await
}

/// Start following a user
#[instrument(skip(state, ctx, form))]
pub async fn follow_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
    form: Option<Form<CsrfForm>>,
) -> Result<Redirect, AppError> {
    let me = ctx.require_user().await?.id;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    ctx.verify_csrf(&state, form.csrf_token.as_deref()).await?;
    let target = find_user(&state, &user_id).await?;

    match model::follows::follow(&state.db, me, target.id).await {
        Ok(created) => debug!("Follow {} -> {} created: {}", me, target.id, created),
        Err(e) if e.is_validation() => {
            warn!("Follow rejected: {}", e);
            ctx.session.flash(FlashLevel::Warning, "You cannot follow yourself.").await;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(&format!("/users/{me}/following")))
}

/// Stop following a user
#[instrument(skip(state, ctx, form))]
pub async fn stop_following(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
    form: Option<Form<CsrfForm>>,
) -> Result<Redirect, AppError> {
    let me = ctx.require_user().await?.id;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    ctx.verify_csrf(&state, form.csrf_token.as_deref()).await?;
    let target = find_user(&state, &user_id).await?;

    let removed = model::follows::unfollow(&state.db, me, target.id).await?;
    debug!("Follow {} -> {} removed: {}", me, target.id, removed);

    Ok(Redirect::to(&format!("/users/{me}/following")))
}

async fn render_edit(
    state: &AppState,
    ctx: &RequestContext,
    form: &ProfileForm,
    errors: Vec<String>,
) -> Result<Html<String>, AppError> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", &errors);
    render(state, ctx, "users/edit.html", context).await
}

/// Profile edit form for the logged-in user
#[instrument(skip(state, ctx))]
pub async fn edit_profile(State(state): State<AppState>, ctx: RequestContext) -> Result<Html<String>, AppError> {
    let user_model = ctx.require_user().await?;
    render_edit(&state, &ctx, &ProfileForm::from(user_model), Vec::new()).await
}

/// Apply a profile edit after checking the current password
#[instrument(skip(state, ctx, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let me = ctx.require_user().await?.id;
    ctx.verify_csrf(&state, form.csrf_token.as_deref()).await?;

    match model::users::update_profile(&state.db, me, &form.password, form.to_update()).await {
        Ok(Some(updated)) => {
            info!("User {} updated their profile", updated.id);
            Ok(Redirect::to(&format!("/users/{}", updated.id)).into_response())
        }
        Ok(None) => {
            ctx.session.flash(FlashLevel::Danger, "Wrong password, please try again.").await;
            Ok(render_edit(&state, &ctx, &form, Vec::new()).await?.into_response())
        }
        Err(e) if e.is_integrity() => {
            warn!("Profile update rejected: {}", e);
            ctx.session.flash(FlashLevel::Danger, "Username already taken").await;
            Ok(render_edit(&state, &ctx, &form, Vec::new()).await?.into_response())
        }
        Err(e) if e.is_validation() => {
            Ok(render_edit(&state, &ctx, &form, vec![e.to_string()]).await?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete the logged-in user's account
#[instrument(skip(state, ctx, form))]
pub async fn delete_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Option<Form<CsrfForm>>,
) -> Result<Redirect, AppError> {
    let me = ctx.require_user().await?.id;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    ctx.verify_csrf(&state, form.csrf_token.as_deref()).await?;

    let deleted = model::users::delete(&state.db, me).await?;
    info!("User {} deleted: {}", me, deleted);
    ctx.session.logout().await;

    Ok(Redirect::to("/signup"))
}
