use std::fmt;

use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Profile image used when a user does not provide one.
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
/// Header image used when a user does not provide one.
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.png";

/// Represents an account on Warbler.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub username: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub location: Option<String>,
    /// Argon2 PHC string, never the plaintext.
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A user authors many messages.
    #[sea_orm(has_many = "super::message::Entity")]
    Message,
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Profile image, falling back to the stock picture.
    pub fn image_url_or_default(&self) -> &str {
        self.image_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_IMAGE_URL)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}
