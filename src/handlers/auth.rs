use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use model::users::NewUser;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use tera::Context;
use tracing::{debug, info, instrument, trace, warn};
use validator::Validate;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::handlers::{CsrfForm, validation_messages};
use crate::schemas::AppState;
use crate::session::FlashLevel;
use crate::views::render;

/// Sign-up form fields
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct SignupForm {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "A valid e-mail is required"))]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(skip_serializing)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: Option<String>,
}

async fn render_signup(
    state: &AppState,
    ctx: &RequestContext,
    form: &SignupForm,
    errors: Vec<String>,
) -> Result<Html<String>, AppError> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", &errors);
    render(state, ctx, "users/signup.html", context).await
}

async fn render_login(state: &AppState, ctx: &RequestContext, username: &str) -> Result<Html<String>, AppError> {
    let mut context = Context::new();
    context.insert("username", username);
    render(state, ctx, "users/login.html", context).await
}

#[instrument(skip(state, ctx))]
pub async fn signup_form(State(state): State<AppState>, ctx: RequestContext) -> Result<Html<String>, AppError> {
    render_signup(&state, &ctx, &SignupForm::default(), Vec::new()).await
}

/// Creates the account and logs it in.
#[instrument(skip(state, ctx, form), fields(username = %form.username))]
pub async fn signup(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    trace!("Entering signup handler");
    ctx.verify_csrf(&state, form.csrf_token.as_deref()).await?;

    if let Err(errors) = form.validate() {
        debug!("Signup form failed validation");
        let messages = validation_messages(&errors);
        return Ok(render_signup(&state, &ctx, &form, messages).await?.into_response());
    }

    let new_user = NewUser {
        username: form.username.clone(),
        email: form.email.clone(),
        password: Some(form.password.clone()),
        image_url: Some(form.image_url.clone()),
    };

    let txn = state.db.begin().await?;
    match model::users::signup(&txn, new_user).await {
        Ok(user_model) => {
            txn.commit().await?;
            info!("User {} signed up", user_model.id);
            ctx.session.login(user_model.id).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) if e.is_integrity() => {
            txn.rollback().await?;
            warn!("Signup rejected: {}", e);
            ctx.session.flash(FlashLevel::Danger, "Username already taken").await;
            Ok(render_signup(&state, &ctx, &form, Vec::new()).await?.into_response())
        }
        Err(e) if e.is_validation() => {
            txn.rollback().await?;
            Ok(render_signup(&state, &ctx, &form, vec![e.to_string()]).await?.into_response())
        }
        Err(e) => {
            txn.rollback().await?;
            Err(e.into())
        }
    }
}

#[instrument(skip(state, ctx))]
pub async fn login_form(State(state): State<AppState>, ctx: RequestContext) -> Result<Html<String>, AppError> {
    render_login(&state, &ctx, "").await
}

#[instrument(skip(state, ctx, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    ctx.verify_csrf(&state, form.csrf_token.as_deref()).await?;

    match model::users::authenticate(&state.db, &form.username, &form.password).await? {
        Some(user_model) => {
            info!("User {} logged in", user_model.id);
            ctx.session.login(user_model.id).await;
            ctx.session
                .flash(FlashLevel::Success, format!("Hello, {}!", user_model.username))
                .await;
            Ok(Redirect::to("/").into_response())
        }
        None => {
            ctx.session.flash(FlashLevel::Danger, "Invalid credentials.").await;
            Ok(render_login(&state, &ctx, &form.username).await?.into_response())
        }
    }
}

#[instrument(skip(state, ctx, form))]
pub async fn logout(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Option<Form<CsrfForm>>,
) -> Result<Redirect, AppError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    ctx.verify_csrf(&state, form.csrf_token.as_deref()).await?;

    if let Some(user_id) = ctx.user_id() {
        debug!("Logging out user {}", user_id);
    }
    ctx.session.logout().await;
    ctx.session
        .flash(FlashLevel::Success, "You have successfully logged out.")
        .await;
    Ok(Redirect::to("/login"))
}
