use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_collectibles_user_location")
                    .table(Collectibles::Table)
                    .col(Collectibles::UserId)
                    .col(Collectibles::LocationId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_favorites_user_location")
                    .table(Favorites::Table)
                    .col(Favorites::UserId)
                    .col(Favorites::LocationId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_sessions_user_active")
                    .table(UserSessions::Table)
                    .col(UserSessions::UserId)
                    .col(UserSessions::IsActive)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_visits_user")
                    .table(Visits::Table)
                    .col(Visits::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_locations_status")
                    .table(Locations::Table)
                    .col(Locations::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_locations_status")
                    .table(Locations::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_visits_user")
                    .table(Visits::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_user_sessions_user_active")
                    .table(UserSessions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_favorites_user_location")
                    .table(Favorites::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_collectibles_user_location")
                    .table(Collectibles::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Collectibles {
    Table,
    UserId,
    LocationId,
}

#[derive(DeriveIden)]
enum Favorites {
    Table,
    UserId,
    LocationId,
}

#[derive(DeriveIden)]
enum UserSessions {
    Table,
    UserId,
    IsActive,
}

#[derive(DeriveIden)]
enum Visits {
    Table,
    UserId,
}

#[derive(DeriveIden)]
enum Locations {
    Table,
    Status,
}
