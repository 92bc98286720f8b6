use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tera::Context;
use tracing::{debug, info, instrument, warn};

use crate::context::{RequestContext, UNAUTHORIZED_FLASH};
use crate::error::AppError;
use crate::handlers::{CsrfForm, parse_id};
use crate::schemas::AppState;
use crate::session::FlashLevel;
use crate::views::{MessageView, render};

#[derive(Debug, Default, Deserialize)]
pub struct MessageForm {
    pub text: String,
    pub csrf_token: Option<String>,
}

async fn render_new(
    state: &AppState,
    ctx: &RequestContext,
    text: &str,
    errors: Vec<String>,
) -> Result<Html<String>, AppError> {
    let mut context = Context::new();
    context.insert("text", text);
    context.insert("errors", &errors);
    render(state, ctx, "messages/new.html", context).await
}

/// Compose form
#[instrument(skip(state, ctx))]
pub async fn new_message_form(State(state): State<AppState>, ctx: RequestContext) -> Result<Html<String>, AppError> {
    ctx.require_user().await?;
    render_new(&state, &ctx, "", Vec::new()).await
}

/// Post a message and go to the author's page
#[instrument(skip(state, ctx, form))]
pub async fn create_message(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let me = ctx.require_user().await?.id;
    ctx.verify_csrf(&state, form.csrf_token.as_deref()).await?;

    match model::messages::create(&state.db, me, &form.text).await {
        Ok(message_model) => {
            debug!("Message {} posted", message_model.id);
            Ok(Redirect::to(&format!("/users/{me}")).into_response())
        }
        Err(e) if e.is_validation() => {
            Ok(render_new(&state, &ctx, &form.text, vec![e.to_string()]).await?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Single message page
#[instrument(skip(state, ctx))]
pub async fn show_message(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(message_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let message_id = parse_id(&message_id)?;
    let (message_model, author) = model::messages::find_with_author(&state.db, message_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut context = Context::new();
    context.insert("message", &MessageView::new(&message_model, &author));
    render(&state, &ctx, "messages/show.html", context).await
}

/// Delete one of the logged-in user's messages
#[instrument(skip(state, ctx, form))]
pub async fn delete_message(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(message_id): Path<String>,
    form: Option<Form<CsrfForm>>,
) -> Result<Redirect, AppError> {
    let me = ctx.require_user().await?.id;
    let form = form.map(|Form(f)| f).unwrap_or_default();
    ctx.verify_csrf(&state, form.csrf_token.as_deref()).await?;

    let message_id = parse_id(&message_id)?;
    let message_model = model::messages::find(&state.db, message_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if message_model.user_id != me {
        warn!("User {} tried to delete message {} owned by {}", me, message_id, message_model.user_id);
        ctx.session.flash(FlashLevel::Danger, UNAUTHORIZED_FLASH).await;
        return Err(AppError::Unauthorized);
    }

    model::messages::remove(&state.db, me, message_id).await?;
    info!("Message {} deleted by its author", message_id);
    Ok(Redirect::to(&format!("/users/{me}")))
}
