use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Email).unique_key())
                    .col(string(Users::Username).unique_key())
                    .col(string_null(Users::ImageUrl).default("/static/images/default-pic.png"))
                    .col(string_null(Users::HeaderImageUrl).default("/static/images/warbler-hero.png"))
                    .col(text_null(Users::Bio))
                    .col(text_null(Users::Location))
                    .col(string(Users::Password))
                    .to_owned(),
            )
            .await?;

        // Create messages table
        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(pk_auto(Messages::Id))
                    .col(string_len(Messages::Text, 140))
                    .col(timestamp_with_time_zone(Messages::Timestamp).default(Expr::current_timestamp()))
                    .col(integer(Messages::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_messages_user")
                            .from(Messages::Table, Messages::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_user_id")
                    .table(Messages::Table)
                    .col(Messages::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Messages::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    Email,
    Username,
    ImageUrl,
    HeaderImageUrl,
    Bio,
    Location,
    Password,
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    Text,
    Timestamp,
    UserId,
}
