use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr};

use crate::entities::user;
use crate::users::{self, NewUser};

pub(crate) async fn setup_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Enable foreign keys
    db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

    Migrator::up(&db, None).await.expect("Migrations failed.");
    Ok(db)
}

pub(crate) fn new_user(username: &str, email: &str, password: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: Some(password.to_string()),
        image_url: None,
    }
}

pub(crate) async fn create_user(db: &DatabaseConnection, username: &str) -> user::Model {
    users::signup(db, new_user(username, &format!("{username}@test.com"), "HASHED_PASSWORD"))
        .await
        .expect("Failed to create user")
}
