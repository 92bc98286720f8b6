use axum::{extract::State, response::Html};
use tera::Context;
use tracing::{debug, instrument, trace};

use crate::context::RequestContext;
use crate::error::AppError;
use crate::schemas::AppState;
use crate::views::{MessageView, ProfileStats, render};

/// Messages shown on the home feed
pub const FEED_LIMIT: u64 = 100;

/// Home page: the feed when logged in, the landing page otherwise.
#[instrument(skip(state, ctx))]
pub async fn homepage(State(state): State<AppState>, ctx: RequestContext) -> Result<Html<String>, AppError> {
    let Some(user_model) = ctx.user.as_ref() else {
        trace!("Rendering anonymous landing page");
        return render(&state, &ctx, "home-anon.html", Context::new()).await;
    };

    let feed = model::messages::feed(&state.db, user_model.id, FEED_LIMIT).await?;
    debug!("Home feed for user {} has {} messages", user_model.id, feed.len());

    let messages: Vec<MessageView> = feed
        .iter()
        .map(|(message_model, author)| MessageView::new(message_model, author))
        .collect();

    let mut context = Context::new();
    context.insert("messages", &messages);
    context.insert("stats", &ProfileStats::load(&state, user_model.id).await?);
    render(&state, &ctx, "home.html", context).await
}
