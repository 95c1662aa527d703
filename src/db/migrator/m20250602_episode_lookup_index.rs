use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Composite references resolve through (show, season, episode), so the
        // triple must be unique as well as fast to look up.
        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_show_season_episode")
                    .table(Episodes::Table)
                    .col(Episodes::ShowId)
                    .col(Episodes::SeasonNumber)
                    .col(Episodes::EpisodeNumber)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_missing_artwork")
                    .table(Episodes::Table)
                    .col(Episodes::ShowId)
                    .col(Episodes::ArtworkUrl)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_episodes_missing_artwork")
                    .table(Episodes::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_episodes_show_season_episode")
                    .table(Episodes::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Episodes {
    Table,
    ShowId,
    SeasonNumber,
    EpisodeNumber,
    ArtworkUrl,
}
