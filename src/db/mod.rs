use crate::models::episode::{CanonicalEpisode, EpisodeInput, EpisodePatch};
use crate::models::show::{ShowInput, ShowPatch, ShowRecord};
use crate::services::catalog::CatalogStore;
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn show_repo(&self) -> repositories::show::ShowRepository {
        repositories::show::ShowRepository::new(self.conn.clone())
    }

    fn episode_repo(&self) -> repositories::episode::EpisodeRepository {
        repositories::episode::EpisodeRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Shows
    // ========================================================================

    pub async fn get_show(&self, id: &str) -> Result<Option<ShowRecord>> {
        self.show_repo().get(id).await
    }

    pub async fn get_show_by_trakt_id(&self, trakt_id: i64) -> Result<Option<ShowRecord>> {
        self.show_repo().get_by_trakt_id(trakt_id).await
    }

    /// Seeds a show row. Used by ingestion and tests; resolution never calls it.
    pub async fn seed_show(&self, input: &ShowInput) -> Result<ShowRecord> {
        self.show_repo().insert(input).await
    }

    pub async fn patch_show(&self, id: &str, patch: &ShowPatch) -> Result<bool> {
        self.show_repo().apply_patch(id, patch).await
    }

    // ========================================================================
    // Episodes
    // ========================================================================

    pub async fn get_episode(&self, id: &str) -> Result<Option<CanonicalEpisode>> {
        self.episode_repo().get(id).await
    }

    pub async fn get_episode_by_number(
        &self,
        show_id: &str,
        season_number: i32,
        episode_number: i32,
    ) -> Result<Option<CanonicalEpisode>> {
        self.episode_repo()
            .get_by_number(show_id, season_number, episode_number)
            .await
    }

    pub async fn list_episodes_missing_artwork(
        &self,
        show_id: &str,
    ) -> Result<Vec<CanonicalEpisode>> {
        self.episode_repo().list_missing_artwork(show_id).await
    }

    /// Seeds an episode row under an existing show.
    pub async fn seed_episode(
        &self,
        show_id: &str,
        input: &EpisodeInput,
    ) -> Result<CanonicalEpisode> {
        self.episode_repo().insert(show_id, input).await
    }

    pub async fn patch_episode(&self, id: &str, patch: &EpisodePatch) -> Result<bool> {
        self.episode_repo().apply_patch(id, patch).await
    }
}

#[async_trait::async_trait]
impl CatalogStore for Store {
    async fn show_by_id(&self, id: &str) -> Result<Option<ShowRecord>> {
        self.get_show(id).await
    }

    async fn show_by_trakt_id(&self, trakt_id: i64) -> Result<Option<ShowRecord>> {
        self.get_show_by_trakt_id(trakt_id).await
    }

    async fn episode_by_id(&self, id: &str) -> Result<Option<CanonicalEpisode>> {
        self.get_episode(id).await
    }

    async fn episode_by_number(
        &self,
        show_id: &str,
        season_number: i32,
        episode_number: i32,
    ) -> Result<Option<CanonicalEpisode>> {
        self.get_episode_by_number(show_id, season_number, episode_number)
            .await
    }

    async fn episodes_missing_artwork(&self, show_id: &str) -> Result<Vec<CanonicalEpisode>> {
        self.list_episodes_missing_artwork(show_id).await
    }

    async fn update_show(&self, id: &str, patch: &ShowPatch) -> Result<bool> {
        self.patch_show(id, patch).await
    }

    async fn update_episode(&self, id: &str, patch: &EpisodePatch) -> Result<bool> {
        self.patch_episode(id, patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> Store {
        let path =
            std::env::temp_dir().join(format!("episoda-store-{}.db", uuid::Uuid::new_v4()));
        Store::new(&format!("sqlite:{}", path.display()))
            .await
            .expect("failed to open store")
    }

    #[tokio::test]
    async fn test_patch_show_ignores_absent_fields() {
        let store = temp_store().await;
        let show = store
            .seed_show(&ShowInput {
                trakt_id: 1390,
                title: "Game of Thrones".to_string(),
                imdb_id: Some("tt0944947".to_string()),
                ..ShowInput::default()
            })
            .await
            .unwrap();

        let written = store
            .patch_show(
                &show.id,
                &ShowPatch {
                    tvmaze_id: Some(82),
                    ..ShowPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(written);

        let reloaded = store.get_show(&show.id).await.unwrap().unwrap();
        assert_eq!(reloaded.tvmaze_id, Some(82));
        assert_eq!(reloaded.imdb_id.as_deref(), Some("tt0944947"));
    }

    #[tokio::test]
    async fn test_empty_patch_writes_nothing() {
        let store = temp_store().await;
        let show = store
            .seed_show(&ShowInput {
                trakt_id: 7,
                title: "Show".to_string(),
                ..ShowInput::default()
            })
            .await
            .unwrap();

        assert!(!store.patch_show(&show.id, &ShowPatch::default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_artwork_listing_is_ordered() {
        let store = temp_store().await;
        let show = store
            .seed_show(&ShowInput {
                trakt_id: 42,
                title: "Ordered".to_string(),
                ..ShowInput::default()
            })
            .await
            .unwrap();

        for (season, number, artwork) in [(2, 1, None), (1, 2, None), (1, 1, Some("a.jpg"))] {
            store
                .seed_episode(
                    &show.id,
                    &EpisodeInput {
                        season_number: season,
                        episode_number: number,
                        title: format!("S{season}E{number}"),
                        artwork_url: artwork.map(str::to_string),
                        ..EpisodeInput::default()
                    },
                )
                .await
                .unwrap();
        }

        let missing = store.list_episodes_missing_artwork(&show.id).await.unwrap();
        let labels: Vec<String> = missing.iter().map(CanonicalEpisode::label).collect();
        assert_eq!(labels, vec!["S1E2", "S2E1"]);
    }
}
