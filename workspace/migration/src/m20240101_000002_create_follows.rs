use sea_orm_migration::{prelude::*, schema::*};

use crate::m20240101_000001_create_users_and_messages::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create follows table (directed edge: following -> being followed)
        manager
            .create_table(
                Table::create()
                    .table(Follows::Table)
                    .if_not_exists()
                    .col(integer(Follows::UserBeingFollowedId))
                    .col(integer(Follows::UserFollowingId))
                    .primary_key(
                        Index::create()
                            .name("pk_follows")
                            .col(Follows::UserBeingFollowedId)
                            .col(Follows::UserFollowingId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follows_user_being_followed")
                            .from(Follows::Table, Follows::UserBeingFollowedId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follows_user_following")
                            .from(Follows::Table, Follows::UserFollowingId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The primary key leads with the followed user; this one serves "who do I follow".
        manager
            .create_index(
                Index::create()
                    .name("idx_follows_user_following_id")
                    .table(Follows::Table)
                    .col(Follows::UserFollowingId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Follows::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Follows {
    Table,
    UserBeingFollowedId,
    UserFollowingId,
}
