use crate::entities::{episodes, prelude::*};
use crate::models::episode::{CanonicalEpisode, EpisodeInput, EpisodePatch};
use anyhow::Result;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

/// Repository for canonical episode records
pub struct EpisodeRepository {
    conn: DatabaseConnection,
}

impl EpisodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: episodes::Model) -> CanonicalEpisode {
        CanonicalEpisode {
            id: m.id,
            show_id: m.show_id,
            season_number: m.season_number,
            episode_number: m.episode_number,
            title: m.title,
            description: m.description,
            rating: m.rating,
            artwork_url: m.artwork_url,
            artwork_checked_at: m.artwork_checked_at,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<CanonicalEpisode>> {
        let row = Episodes::find_by_id(id.to_string())
            .one(&self.conn)
            .await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn get_by_number(
        &self,
        show_id: &str,
        season_number: i32,
        episode_number: i32,
    ) -> Result<Option<CanonicalEpisode>> {
        let row = Episodes::find()
            .filter(episodes::Column::ShowId.eq(show_id))
            .filter(episodes::Column::SeasonNumber.eq(season_number))
            .filter(episodes::Column::EpisodeNumber.eq(episode_number))
            .one(&self.conn)
            .await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn list_missing_artwork(&self, show_id: &str) -> Result<Vec<CanonicalEpisode>> {
        let rows = Episodes::find()
            .filter(episodes::Column::ShowId.eq(show_id))
            .filter(episodes::Column::ArtworkUrl.is_null())
            .order_by_asc(episodes::Column::SeasonNumber)
            .order_by_asc(episodes::Column::EpisodeNumber)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn insert(&self, show_id: &str, input: &EpisodeInput) -> Result<CanonicalEpisode> {
        let id = uuid::Uuid::new_v4().to_string();
        let model = episodes::ActiveModel {
            id: Set(id.clone()),
            show_id: Set(show_id.to_string()),
            season_number: Set(input.season_number),
            episode_number: Set(input.episode_number),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            rating: Set(input.rating),
            artwork_url: Set(input.artwork_url.clone()),
            artwork_checked_at: Set(None),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        Episodes::insert(model).exec(&self.conn).await?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Inserted row {id} could not be read back"))
    }

    pub async fn apply_patch(&self, id: &str, patch: &EpisodePatch) -> Result<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut update = Episodes::update_many().filter(episodes::Column::Id.eq(id));

        if let Some(url) = &patch.artwork_url {
            update = update.col_expr(episodes::Column::ArtworkUrl, Expr::value(url.clone()));
        }
        if let Some(at) = &patch.artwork_checked_at {
            update = update.col_expr(episodes::Column::ArtworkCheckedAt, Expr::value(at.clone()));
        }

        let result = update.exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
