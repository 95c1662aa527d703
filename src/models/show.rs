use serde::{Deserialize, Serialize};

/// A show as stored locally, with every cross-catalog id learned so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowRecord {
    pub id: String,
    pub trakt_id: i64,
    pub tvmaze_id: Option<i32>,
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<i32>,
    pub tmdb_id: Option<i32>,
    pub title: String,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub rating: Option<f32>,
    pub cross_refs_fetched_at: Option<String>,
}

impl ShowRecord {
    /// True when neither IMDb nor TVDB ids are known.
    #[must_use]
    pub const fn lacks_cross_references(&self) -> bool {
        self.imdb_id.is_none() && self.tvdb_id.is_none()
    }

    /// Folds a patch into this record using the same rules the store applies:
    /// empty values are ignored and nothing is ever cleared.
    pub fn apply(&mut self, patch: &ShowPatch) {
        if let Some(id) = patch.tvmaze_id {
            self.tvmaze_id = Some(id);
        }
        if let Some(imdb) = non_empty(patch.imdb_id.as_deref()) {
            self.imdb_id = Some(imdb.to_string());
        }
        if let Some(tvdb) = patch.tvdb_id {
            self.tvdb_id = Some(tvdb);
        }
        if let Some(url) = non_empty(patch.poster_url.as_deref()) {
            self.poster_url = Some(url.to_string());
        }
        if let Some(url) = non_empty(patch.backdrop_url.as_deref()) {
            self.backdrop_url = Some(url.to_string());
        }
        if let Some(at) = &patch.cross_refs_fetched_at {
            self.cross_refs_fetched_at = Some(at.clone());
        }
    }
}

/// Ingestion-side input used to seed a show row.
#[derive(Debug, Clone, Default)]
pub struct ShowInput {
    pub trakt_id: i64,
    pub title: String,
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<i32>,
    pub tmdb_id: Option<i32>,
    pub tvmaze_id: Option<i32>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub rating: Option<f32>,
}

/// Newly discovered show-level values. `None` means "nothing learned".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowPatch {
    pub tvmaze_id: Option<i32>,
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<i32>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub cross_refs_fetched_at: Option<String>,
}

impl ShowPatch {
    /// Drops blank strings so they can never reach the store.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            imdb_id: self.imdb_id.filter(|s| !s.trim().is_empty()),
            poster_url: self.poster_url.filter(|s| !s.trim().is_empty()),
            backdrop_url: self.backdrop_url.filter(|s| !s.trim().is_empty()),
            ..self
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tvmaze_id.is_none()
            && self.imdb_id.is_none()
            && self.tvdb_id.is_none()
            && self.poster_url.is_none()
            && self.backdrop_url.is_none()
            && self.cross_refs_fetched_at.is_none()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
