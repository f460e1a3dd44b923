use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Comparison and admin owner lookups go through app_id
        manager
            .create_index(
                Index::create()
                    .name("idx_owned_games_app_id")
                    .table(OwnedGames::Table)
                    .col(OwnedGames::AppId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_steam_accounts_user_id")
                    .table(SteamAccounts::Table)
                    .col(SteamAccounts::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_games_price_backfill")
                    .table(Games::Table)
                    .col(Games::PriceLastFetchedAt)
                    .col(Games::PriceFetchAttempts)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_games_price_backfill").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_steam_accounts_user_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_owned_games_app_id").to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OwnedGames {
    Table,
    AppId,
}

#[derive(DeriveIden)]
enum SteamAccounts {
    Table,
    UserId,
}

#[derive(DeriveIden)]
enum Games {
    Table,
    PriceLastFetchedAt,
    PriceFetchAttempts,
}
