//! The follow graph, stored as a single edge table.
//!
//! `follow(a, b)` is both "a appends b to following" and "b appends a to
//! followers": one row, read from either end through [`edges_from`] and
//! [`edges_to`].

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Set, sea_query::OnConflict,
};
use tracing::{debug, instrument};

use crate::entities::{follow, user};
use crate::error::ModelError;

/// Edges where `user_id` is the follower.
pub async fn edges_from<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<follow::Model>, ModelError> {
    Ok(follow::Entity::find()
        .filter(follow::Column::UserFollowingId.eq(user_id))
        .all(conn)
        .await?)
}

/// Edges where `user_id` is the one being followed.
pub async fn edges_to<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<follow::Model>, ModelError> {
    Ok(follow::Entity::find()
        .filter(follow::Column::UserBeingFollowedId.eq(user_id))
        .all(conn)
        .await?)
}

/// Users that `user_id` follows.
pub async fn following<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<user::Model>, ModelError> {
    Ok(user::Entity::find()
        .join(JoinType::InnerJoin, follow::Relation::Followed.def().rev())
        .filter(follow::Column::UserFollowingId.eq(user_id))
        .order_by_asc(user::Column::Username)
        .all(conn)
        .await?)
}

/// Users following `user_id`.
pub async fn followers<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<user::Model>, ModelError> {
    Ok(user::Entity::find()
        .join(JoinType::InnerJoin, follow::Relation::Follower.def().rev())
        .filter(follow::Column::UserBeingFollowedId.eq(user_id))
        .order_by_asc(user::Column::Username)
        .all(conn)
        .await?)
}

/// How many users `user_id` follows.
pub async fn count_following<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<u64, ModelError> {
    Ok(follow::Entity::find()
        .filter(follow::Column::UserFollowingId.eq(user_id))
        .count(conn)
        .await?)
}

/// How many users follow `user_id`.
pub async fn count_followers<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<u64, ModelError> {
    Ok(follow::Entity::find()
        .filter(follow::Column::UserBeingFollowedId.eq(user_id))
        .count(conn)
        .await?)
}

/// Makes `follower_id` follow `followed_id`.
///
/// Returns `Ok(false)` when the edge already exists. Following yourself is a
/// validation error.
#[instrument(skip(conn))]
pub async fn follow<C: ConnectionTrait>(
    conn: &C,
    follower_id: i32,
    followed_id: i32,
) -> Result<bool, ModelError> {
    if follower_id == followed_id {
        return Err(ModelError::Validation("users cannot follow themselves".to_string()));
    }

    let rows_affected = follow::Entity::insert(follow::ActiveModel {
        user_being_followed_id: Set(followed_id),
        user_following_id: Set(follower_id),
    })
    .on_conflict(
        OnConflict::columns([
            follow::Column::UserBeingFollowedId,
            follow::Column::UserFollowingId,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    if rows_affected == 0 {
        debug!("User {} already follows {}", follower_id, followed_id);
        return Ok(false);
    }

    debug!("User {} now follows {}", follower_id, followed_id);
    Ok(true)
}

/// Removes the edge; `Ok(false)` if there was none.
#[instrument(skip(conn))]
pub async fn unfollow<C: ConnectionTrait>(
    conn: &C,
    follower_id: i32,
    followed_id: i32,
) -> Result<bool, ModelError> {
    let delete_result = follow::Entity::delete_by_id((followed_id, follower_id))
        .exec(conn)
        .await?;

    debug!("Unfollow completed. Rows affected: {}", delete_result.rows_affected);
    Ok(delete_result.rows_affected > 0)
}

/// Does `user_id` follow `other_id`?
pub async fn is_following<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    other_id: i32,
) -> Result<bool, ModelError> {
    Ok(edge(conn, user_id, other_id).await?.is_some())
}

/// Is `user_id` followed by `other_id`?
pub async fn is_followed_by<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    other_id: i32,
) -> Result<bool, ModelError> {
    Ok(edge(conn, other_id, user_id).await?.is_some())
}

async fn edge<C: ConnectionTrait>(
    conn: &C,
    follower_id: i32,
    followed_id: i32,
) -> Result<Option<follow::Model>, ModelError> {
    Ok(follow::Entity::find_by_id((followed_id, follower_id))
        .one(conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_user, setup_db};

    #[tokio::test]
    async fn test_is_following() {
        let db = setup_db().await.unwrap();
        let u1 = create_user(&db, "test1user").await;
        let u2 = create_user(&db, "test2user").await;

        // u1 appends u2 to its following
        assert!(follow(&db, u1.id, u2.id).await.unwrap());

        let following_u1 = following(&db, u1.id).await.unwrap();
        assert_eq!(following_u1.len(), 1);
        assert_eq!(
            following_u1[0].to_string(),
            format!("<User #{}: test2user, test2user@test.com>", u2.id)
        );
        assert!(is_following(&db, u1.id, u2.id).await.unwrap());
        assert!(followers(&db, u2.id).await.unwrap().contains(&u1));

        // u1 removes u2 from its following
        assert!(unfollow(&db, u1.id, u2.id).await.unwrap());
        assert!(!following(&db, u1.id).await.unwrap().contains(&u2));
        assert!(!followers(&db, u2.id).await.unwrap().contains(&u1));
        assert!(!is_following(&db, u1.id, u2.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_followed_by() {
        let db = setup_db().await.unwrap();
        let u1 = create_user(&db, "test1user").await;
        let u2 = create_user(&db, "test2user").await;

        // u1 appends u2 to its followers: the same edge as u2 following u1
        follow(&db, u2.id, u1.id).await.unwrap();
        assert!(followers(&db, u1.id).await.unwrap().contains(&u2));
        assert!(is_followed_by(&db, u1.id, u2.id).await.unwrap());
        assert!(!is_followed_by(&db, u2.id, u1.id).await.unwrap());

        unfollow(&db, u2.id, u1.id).await.unwrap();
        assert!(!followers(&db, u1.id).await.unwrap().contains(&u2));
        assert!(!is_followed_by(&db, u1.id, u2.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_edges_from_and_to() {
        let db = setup_db().await.unwrap();
        let a = create_user(&db, "a").await;
        let b = create_user(&db, "b").await;
        let c = create_user(&db, "c").await;

        follow(&db, a.id, b.id).await.unwrap();
        follow(&db, a.id, c.id).await.unwrap();
        follow(&db, c.id, b.id).await.unwrap();

        let from_a = edges_from(&db, a.id).await.unwrap();
        assert_eq!(from_a.len(), 2);
        assert!(from_a.iter().all(|e| e.user_following_id == a.id));

        let to_b = edges_to(&db, b.id).await.unwrap();
        let mut follower_ids: Vec<i32> = to_b.iter().map(|e| e.user_following_id).collect();
        follower_ids.sort();
        let mut expected = vec![a.id, c.id];
        expected.sort();
        assert_eq!(follower_ids, expected);

        assert!(edges_to(&db, a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_follow_is_idempotent() {
        let db = setup_db().await.unwrap();
        let u1 = create_user(&db, "test1user").await;
        let u2 = create_user(&db, "test2user").await;

        assert!(follow(&db, u1.id, u2.id).await.unwrap());
        assert!(!follow(&db, u1.id, u2.id).await.unwrap());
        assert_eq!(edges_from(&db, u1.id).await.unwrap().len(), 1);

        assert!(unfollow(&db, u1.id, u2.id).await.unwrap());
        assert!(!unfollow(&db, u1.id, u2.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_follows() {
        let db = setup_db().await.unwrap();
        let u1 = create_user(&db, "test1user").await;
        let u2 = create_user(&db, "test2user").await;

        let (first, second) = tokio::join!(follow(&db, u1.id, u2.id), follow(&db, u1.id, u2.id));
        let mut created = vec![first.unwrap(), second.unwrap()];
        created.sort();

        assert_eq!(created, vec![false, true]);
        assert_eq!(edges_from(&db, u1.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_follow_counts() {
        let db = setup_db().await.unwrap();
        let a = create_user(&db, "a").await;
        let b = create_user(&db, "b").await;
        let c = create_user(&db, "c").await;

        follow(&db, a.id, b.id).await.unwrap();
        follow(&db, a.id, c.id).await.unwrap();
        follow(&db, c.id, b.id).await.unwrap();

        assert_eq!(count_following(&db, a.id).await.unwrap(), 2);
        assert_eq!(count_followers(&db, a.id).await.unwrap(), 0);
        assert_eq!(count_followers(&db, b.id).await.unwrap(), 2);
        assert_eq!(count_following(&db, b.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_self_follow_rejected() {
        let db = setup_db().await.unwrap();
        let u1 = create_user(&db, "test1user").await;

        let result = follow(&db, u1.id, u1.id).await;
        assert!(result.unwrap_err().is_validation());
        assert!(edges_from(&db, u1.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follow_unknown_user_is_integrity_error() {
        let db = setup_db().await.unwrap();
        let u1 = create_user(&db, "test1user").await;

        let result = follow(&db, u1.id, 9999999).await;
        assert!(result.unwrap_err().is_integrity());
    }
}
