//! Messages: creation, per-user listings and the home feed.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::{debug, info, instrument};

use crate::entities::{message, user};
use crate::error::ModelError;
use crate::follows;

/// Longest message text accepted, in characters.
pub const MAX_MESSAGE_LEN: usize = 140;

/// Posts a message for `user_id`. Surrounding whitespace is trimmed first.
#[instrument(skip(conn, text))]
pub async fn create<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    text: &str,
) -> Result<message::Model, ModelError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ModelError::Validation("message text must not be empty".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(ModelError::Validation(format!(
            "message text must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }

    let message_model = message::ActiveModel {
        text: Set(text.to_string()),
        timestamp: Set(Utc::now()),
        user_id: Set(user_id),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    info!("Message {} created by user {}", message_model.id, user_id);
    Ok(message_model)
}

pub async fn find<C: ConnectionTrait>(
    conn: &C,
    message_id: i32,
) -> Result<Option<message::Model>, ModelError> {
    Ok(message::Entity::find_by_id(message_id).one(conn).await?)
}

/// A message together with its author.
pub async fn find_with_author<C: ConnectionTrait>(
    conn: &C,
    message_id: i32,
) -> Result<Option<(message::Model, user::Model)>, ModelError> {
    let found = message::Entity::find_by_id(message_id)
        .find_also_related(user::Entity)
        .one(conn)
        .await?;

    Ok(found.and_then(|(message_model, author)| author.map(|author| (message_model, author))))
}

/// The user's messages, newest first.
pub async fn for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<message::Model>, ModelError> {
    Ok(message::Entity::find()
        .filter(message::Column::UserId.eq(user_id))
        .order_by_desc(message::Column::Timestamp)
        .order_by_desc(message::Column::Id)
        .all(conn)
        .await?)
}

pub async fn count_for_user<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<u64, ModelError> {
    Ok(message::Entity::find()
        .filter(message::Column::UserId.eq(user_id))
        .count(conn)
        .await?)
}

/// Removes a message from its owner's collection.
///
/// Returns `Ok(false)` when the message does not exist or belongs to someone
/// else.
#[instrument(skip(conn))]
pub async fn remove<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    message_id: i32,
) -> Result<bool, ModelError> {
    let delete_result = message::Entity::delete_many()
        .filter(message::Column::Id.eq(message_id))
        .filter(message::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;

    debug!("Delete operation completed. Rows affected: {}", delete_result.rows_affected);
    Ok(delete_result.rows_affected > 0)
}

/// Newest messages written by `user_id` or anyone they follow.
#[instrument(skip(conn))]
pub async fn feed<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    limit: u64,
) -> Result<Vec<(message::Model, user::Model)>, ModelError> {
    let mut author_ids: Vec<i32> = follows::edges_from(conn, user_id)
        .await?
        .into_iter()
        .map(|edge| edge.user_being_followed_id)
        .collect();
    author_ids.push(user_id);

    let rows = message::Entity::find()
        .filter(message::Column::UserId.is_in(author_ids))
        .order_by_desc(message::Column::Timestamp)
        .order_by_desc(message::Column::Id)
        .limit(limit)
        .find_also_related(user::Entity)
        .all(conn)
        .await?;

    debug!("Feed for user {} has {} messages", user_id, rows.len());
    Ok(rows
        .into_iter()
        .filter_map(|(message_model, author)| author.map(|author| (message_model, author)))
        .collect())
}
