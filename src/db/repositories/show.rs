use crate::entities::{prelude::*, shows};
use crate::models::show::{ShowInput, ShowPatch, ShowRecord};
use anyhow::Result;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

/// Repository for show records and their cross-catalog ids
pub struct ShowRepository {
    conn: DatabaseConnection,
}

impl ShowRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: shows::Model) -> ShowRecord {
        ShowRecord {
            id: m.id,
            trakt_id: m.trakt_id,
            tvmaze_id: m.tvmaze_id,
            imdb_id: m.imdb_id,
            tvdb_id: m.tvdb_id,
            tmdb_id: m.tmdb_id,
            title: m.title,
            description: m.description,
            poster_url: m.poster_url,
            backdrop_url: m.backdrop_url,
            rating: m.rating,
            cross_refs_fetched_at: m.cross_refs_fetched_at,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<ShowRecord>> {
        let row = Shows::find_by_id(id.to_string()).one(&self.conn).await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn get_by_trakt_id(&self, trakt_id: i64) -> Result<Option<ShowRecord>> {
        let row = Shows::find()
            .filter(shows::Column::TraktId.eq(trakt_id))
            .one(&self.conn)
            .await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn insert(&self, input: &ShowInput) -> Result<ShowRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let model = shows::ActiveModel {
            id: Set(id.clone()),
            trakt_id: Set(input.trakt_id),
            tvmaze_id: Set(input.tvmaze_id),
            imdb_id: Set(input.imdb_id.clone()),
            tvdb_id: Set(input.tvdb_id),
            tmdb_id: Set(input.tmdb_id),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            poster_url: Set(input.poster_url.clone()),
            backdrop_url: Set(None),
            rating: Set(input.rating),
            cross_refs_fetched_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        Shows::insert(model).exec(&self.conn).await?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Inserted row {id} could not be read back"))
    }

    /// Writes only the columns the patch carries a value for.
    ///
    /// Returns `false` when there was nothing to write or no row matched.
    pub async fn apply_patch(&self, id: &str, patch: &ShowPatch) -> Result<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut update = Shows::update_many().filter(shows::Column::Id.eq(id));

        if let Some(tvmaze_id) = patch.tvmaze_id {
            update = update.col_expr(shows::Column::TvmazeId, Expr::value(tvmaze_id));
        }
        if let Some(imdb_id) = &patch.imdb_id {
            update = update.col_expr(shows::Column::ImdbId, Expr::value(imdb_id.clone()));
        }
        if let Some(tvdb_id) = patch.tvdb_id {
            update = update.col_expr(shows::Column::TvdbId, Expr::value(tvdb_id));
        }
        if let Some(url) = &patch.poster_url {
            update = update.col_expr(shows::Column::PosterUrl, Expr::value(url.clone()));
        }
        if let Some(url) = &patch.backdrop_url {
            update = update.col_expr(shows::Column::BackdropUrl, Expr::value(url.clone()));
        }
        if let Some(at) = &patch.cross_refs_fetched_at {
            update = update.col_expr(shows::Column::CrossRefsFetchedAt, Expr::value(at.clone()));
        }

        let result = update
            .col_expr(
                shows::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
