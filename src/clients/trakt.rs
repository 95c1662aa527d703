use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

use crate::services::catalog::{CrossReferences, PrimaryCatalog};

const TRAKT_API: &str = "https://api.trakt.tv";
const TRAKT_API_VERSION: &str = "2";

#[derive(Debug, Deserialize)]
pub struct TraktShow {
    pub title: String,
    pub year: Option<i32>,
    pub ids: TraktIds,
    pub overview: Option<String>,
    pub rating: Option<f32>,
    pub aired_episodes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct TraktIds {
    pub trakt: i64,
    pub slug: Option<String>,
    pub tvdb: Option<i32>,
    pub imdb: Option<String>,
    pub tmdb: Option<i32>,
}

#[derive(Clone)]
pub struct TraktClient {
    client: Client,
    base_url: String,
    client_id: String,
}

impl TraktClient {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self::with_config(Client::new(), TRAKT_API, client_id)
    }

    pub fn with_config(
        client: Client,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        }
    }

    pub async fn get_show(&self, trakt_id: i64) -> Result<Option<TraktShow>> {
        let url = format!("{}/shows/{}?extended=full", self.base_url, trakt_id);
        let response = self
            .client
            .get(&url)
            .header("Content-Type", "application/json")
            .header("trakt-api-version", TRAKT_API_VERSION)
            .header("trakt-api-key", &self.client_id)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Trakt API error: {} - {}", status, body));
        }

        let show: TraktShow = response.json().await?;
        Ok(Some(show))
    }
}

#[async_trait::async_trait]
impl PrimaryCatalog for TraktClient {
    fn name(&self) -> &'static str {
        "trakt"
    }

    async fn cross_references(&self, trakt_id: i64) -> Result<CrossReferences> {
        let Some(show) = self.get_show(trakt_id).await? else {
            return Ok(CrossReferences::default());
        };

        Ok(CrossReferences {
            imdb_id: show.ids.imdb.filter(|s| !s.is_empty()),
            tvdb_id: show.ids.tvdb,
        })
    }
}
