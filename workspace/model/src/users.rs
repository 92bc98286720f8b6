//! Account operations: signup, authentication and profile management.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, error, info, instrument, warn};

use crate::entities::{follow, message, user};
use crate::error::ModelError;

/// Data required to create an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    pub image_url: Option<String>,
}

/// Editable profile fields. Empty image URLs fall back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// Generates a new password hash using argon2.
pub fn hash_password(password: &str) -> Result<String, ModelError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ModelError::PasswordHash(e.to_string()))
}

/// Uses argon2 to verify the password hash against the provided password.
pub fn verify_password(password_hash: &str, password: &str) -> bool {
    let hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(err) => {
            error!("failed to parse password hash: {}", err);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, ModelError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ModelError::Validation(format!("{field} must not be empty")));
    }
    Ok(value)
}

fn image_or(url: Option<String>, default: &str) -> String {
    url.map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Creates a user with a hashed password.
///
/// Runs on whatever connection it is given, so callers that pass a
/// transaction decide when the row becomes visible. An empty or missing
/// password is rejected before the database is touched; a taken username or
/// email comes back as [`ModelError::Integrity`].
#[instrument(skip(conn, new_user), fields(username = %new_user.username))]
pub async fn signup<C: ConnectionTrait>(
    conn: &C,
    new_user: NewUser,
) -> Result<user::Model, ModelError> {
    let username = required("username", &new_user.username)?;
    let email = required("email", &new_user.email)?;
    let password = new_user
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ModelError::Validation("password must not be empty".to_string()))?;

    let hashed = hash_password(password)?;

    let new_user_model = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password: Set(hashed),
        image_url: Set(Some(image_or(new_user.image_url, user::DEFAULT_IMAGE_URL))),
        header_image_url: Set(Some(user::DEFAULT_HEADER_IMAGE_URL.to_string())),
        bio: Set(None),
        location: Set(None),
        ..Default::default()
    };

    match new_user_model.insert(conn).await {
        Ok(user_model) => {
            info!("User created with ID: {}, username: {}", user_model.id, user_model.username);
            Ok(user_model)
        }
        Err(db_error) => {
            let model_error = ModelError::from(db_error);
            warn!("Failed to create user '{}': {}", username, model_error);
            Err(model_error)
        }
    }
}

/// Returns the user when the username exists and the password matches.
///
/// An unknown username and a wrong password both yield `Ok(None)`.
#[instrument(skip(conn, password))]
pub async fn authenticate<C: ConnectionTrait>(
    conn: &C,
    username: &str,
    password: &str,
) -> Result<Option<user::Model>, ModelError> {
    let Some(user_model) = find_by_username(conn, username).await? else {
        debug!("Authentication failed: unknown username");
        return Ok(None);
    };

    if verify_password(&user_model.password, password) {
        debug!("Authentication succeeded for user ID: {}", user_model.id);
        Ok(Some(user_model))
    } else {
        debug!("Authentication failed: password mismatch");
        Ok(None)
    }
}

pub async fn find<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Option<user::Model>, ModelError> {
    Ok(user::Entity::find_by_id(user_id).one(conn).await?)
}

pub async fn find_by_username<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> Result<Option<user::Model>, ModelError> {
    Ok(user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(conn)
        .await?)
}

/// All users, or those whose username contains `query`.
#[instrument(skip(conn))]
pub async fn search<C: ConnectionTrait>(
    conn: &C,
    query: Option<&str>,
) -> Result<Vec<user::Model>, ModelError> {
    let mut select = user::Entity::find().order_by_asc(user::Column::Username);

    if let Some(term) = query.map(str::trim).filter(|t| !t.is_empty()) {
        select = select.filter(user::Column::Username.contains(term));
    }

    Ok(select.all(conn).await?)
}

/// Updates the profile after re-checking the current password.
///
/// Returns `Ok(None)` when the user does not exist or the password is wrong.
#[instrument(skip(conn, password, update))]
pub async fn update_profile<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    password: &str,
    update: ProfileUpdate,
) -> Result<Option<user::Model>, ModelError> {
    let Some(existing) = find(conn, user_id).await? else {
        warn!("User with ID {} not found for profile update", user_id);
        return Ok(None);
    };

    if !verify_password(&existing.password, password) {
        debug!("Profile update rejected: password mismatch");
        return Ok(None);
    }

    let username = required("username", &update.username)?.to_string();
    let email = required("email", &update.email)?.to_string();

    let mut user_active: user::ActiveModel = existing.into();
    user_active.username = Set(username);
    user_active.email = Set(email);
    user_active.image_url = Set(Some(image_or(update.image_url, user::DEFAULT_IMAGE_URL)));
    user_active.header_image_url = Set(Some(image_or(
        update.header_image_url,
        user::DEFAULT_HEADER_IMAGE_URL,
    )));
    user_active.bio = Set(optional_text(update.bio));
    user_active.location = Set(optional_text(update.location));

    let updated = user_active.update(conn).await?;
    info!("User with ID {} updated profile", updated.id);
    Ok(Some(updated))
}

/// Deletes a user together with their messages and follow edges.
#[instrument(skip(db))]
pub async fn delete<C: TransactionTrait>(db: &C, user_id: i32) -> Result<bool, ModelError> {
    let txn = db.begin().await?;

    message::Entity::delete_many()
        .filter(message::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    follow::Entity::delete_many()
        .filter(
            Condition::any()
                .add(follow::Column::UserFollowingId.eq(user_id))
                .add(follow::Column::UserBeingFollowedId.eq(user_id)),
        )
        .exec(&txn)
        .await?;

    let delete_result = user::Entity::delete_by_id(user_id).exec(&txn).await?;
    txn.commit().await?;

    debug!("Delete operation completed. Rows affected: {}", delete_result.rows_affected);
    Ok(delete_result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use sea_orm::{EntityTrait, PaginatorTrait, TransactionTrait};

    use super::*;
    use crate::entities::prelude::*;
    use crate::testing::{create_user, new_user, setup_db};
    use crate::{follows, messages};

    #[tokio::test]
    async fn test_user_model() {
        let db = setup_db().await.unwrap();

        let user = signup(&db, new_user("testuser", "test@test.com", "HASHED_PASSWORD"))
            .await
            .unwrap();

        // User should have no messages & no followers
        assert_eq!(messages::count_for_user(&db, user.id).await.unwrap(), 0);
        assert!(follows::followers(&db, user.id).await.unwrap().is_empty());
        assert!(follows::following(&db, user.id).await.unwrap().is_empty());
        assert_eq!(user.image_url.as_deref(), Some(user::DEFAULT_IMAGE_URL));
    }

    #[tokio::test]
    async fn test_signup_hashes_password() {
        let db = setup_db().await.unwrap();

        let user = signup(&db, new_user("testuser", "test@test.com", "HASHED_PASSWORD"))
            .await
            .unwrap();

        assert_ne!(user.password, "HASHED_PASSWORD");
        assert!(user.password.starts_with("$argon2"));
        assert!(verify_password(&user.password, "HASHED_PASSWORD"));
    }

    #[tokio::test]
    async fn test_user_sign_up_success_and_fail() {
        let db = setup_db().await.unwrap();

        let txn = db.begin().await.unwrap();
        signup(&txn, new_user("test1user", "test1@test.com", "HASHED_PASSWORD"))
            .await
            .unwrap();
        txn.commit().await.unwrap();

        // Username is already taken
        let txn = db.begin().await.unwrap();
        let taken = signup(&txn, new_user("test1user", "test21@test.com", "2132123124")).await;
        assert!(matches!(taken, Err(ModelError::Integrity(_))));
        txn.rollback().await.unwrap();

        // Email is already taken
        let taken = signup(&db, new_user("test21user", "test1@test.com", "2132123124")).await;
        assert!(matches!(taken, Err(ModelError::Integrity(_))));

        // Missing password is a validation error and writes nothing
        let mut missing = new_user("test12user", "test12@test.com", "");
        missing.password = None;
        let result = signup(&db, missing).await;
        assert!(matches!(result, Err(ModelError::Validation(_))));

        let empty = signup(&db, new_user("test12user", "test12@test.com", "")).await;
        assert!(matches!(empty, Err(ModelError::Validation(_))));

        // The session stays usable after the rollback
        assert_eq!(User::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_signup_rejects_blank_username() {
        let db = setup_db().await.unwrap();

        let result = signup(&db, new_user("   ", "blank@test.com", "secret")).await;
        assert!(result.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_user_authenticate() {
        let db = setup_db().await.unwrap();
        signup(&db, new_user("test1user", "test1@test.com", "HASHED_PASSWORD"))
            .await
            .unwrap();

        let valid = authenticate(&db, "test1user", "HASHED_PASSWORD").await.unwrap();
        assert_eq!(valid.map(|u| u.username), Some("test1user".to_string()));
    }

    #[tokio::test]
    async fn test_user_authenticate_fail_username() {
        let db = setup_db().await.unwrap();
        signup(&db, new_user("test1user", "test1@test.com", "HASHED_PASSWORD"))
            .await
            .unwrap();

        let invalid = authenticate(&db, "test", "HASHED_PASSWORD").await.unwrap();
        assert!(invalid.is_none());
    }

    #[tokio::test]
    async fn test_user_authenticate_fail_password() {
        let db = setup_db().await.unwrap();
        signup(&db, new_user("test1user", "test1@test.com", "HASHED_PASSWORD"))
            .await
            .unwrap();

        let invalid = authenticate(&db, "test1user", "HASHED").await.unwrap();
        assert!(invalid.is_none());
    }

    #[tokio::test]
    async fn test_search_users() {
        let db = setup_db().await.unwrap();
        create_user(&db, "alice").await;
        create_user(&db, "alfred").await;
        create_user(&db, "bob").await;

        let all = search(&db, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let matching: Vec<String> = search(&db, Some("al"))
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(matching, vec!["alfred".to_string(), "alice".to_string()]);

        assert_eq!(search(&db, Some("  ")).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_profile_requires_password() {
        let db = setup_db().await.unwrap();
        let user = create_user(&db, "testuser").await;

        let update = ProfileUpdate {
            username: "renamed".to_string(),
            email: "renamed@test.com".to_string(),
            bio: Some("Hello there".to_string()),
            ..Default::default()
        };

        let rejected = update_profile(&db, user.id, "wrong", update.clone()).await.unwrap();
        assert!(rejected.is_none());

        let updated = update_profile(&db, user.id, "HASHED_PASSWORD", update)
            .await
            .unwrap()
            .expect("password is correct");
        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.bio.as_deref(), Some("Hello there"));
        assert_eq!(updated.image_url.as_deref(), Some(user::DEFAULT_IMAGE_URL));
        assert_eq!(updated.location, None);
    }

    #[tokio::test]
    async fn test_update_profile_duplicate_username() {
        let db = setup_db().await.unwrap();
        let user = create_user(&db, "testuser").await;
        create_user(&db, "taken").await;

        let update = ProfileUpdate {
            username: "taken".to_string(),
            email: "testuser@test.com".to_string(),
            ..Default::default()
        };

        let result = update_profile(&db, user.id, "HASHED_PASSWORD", update).await;
        assert!(result.unwrap_err().is_integrity());
    }

    #[tokio::test]
    async fn test_delete_user_removes_messages_and_edges() {
        let db = setup_db().await.unwrap();
        let user = create_user(&db, "testuser").await;
        let other = create_user(&db, "other").await;

        messages::create(&db, user.id, "Hello!").await.unwrap();
        follows::follow(&db, user.id, other.id).await.unwrap();
        follows::follow(&db, other.id, user.id).await.unwrap();

        assert!(delete(&db, user.id).await.unwrap());
        assert!(find(&db, user.id).await.unwrap().is_none());
        assert_eq!(Message::find().count(&db).await.unwrap(), 0);
        assert_eq!(Follow::find().count(&db).await.unwrap(), 0);

        // Deleting again reports nothing removed
        assert!(!delete(&db, user.id).await.unwrap());
    }
}
