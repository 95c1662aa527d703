use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::services::catalog::{SecondaryCatalog, SecondaryShow};

const TVMAZE_API: &str = "https://api.tvmaze.com";

#[derive(Debug, Deserialize)]
pub struct TvmazeShow {
    pub id: i32,
    pub name: String,
    pub image: Option<TvmazeImage>,
    pub summary: Option<String>,
    pub externals: Option<TvmazeExternals>,
}

#[derive(Debug, Deserialize)]
pub struct TvmazeImage {
    pub medium: Option<String>,
    pub original: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TvmazeExternals {
    pub tvrage: Option<i32>,
    pub thetvdb: Option<i32>,
    pub imdb: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TvmazeEpisode {
    pub id: i32,
    pub name: Option<String>,
    pub season: i32,
    pub number: Option<i32>,
    pub image: Option<TvmazeImage>,
}

#[derive(Debug, Deserialize)]
pub struct TvmazeShowImage {
    pub id: i32,
    #[serde(rename = "type")]
    pub image_type: Option<String>,
    #[serde(default)]
    pub main: bool,
    pub resolutions: TvmazeResolutions,
}

#[derive(Debug, Deserialize)]
pub struct TvmazeResolutions {
    pub original: TvmazeResolution,
}

#[derive(Debug, Deserialize)]
pub struct TvmazeResolution {
    pub url: String,
}

impl TvmazeImage {
    fn best(&self) -> Option<String> {
        self.original.clone().or_else(|| self.medium.clone())
    }
}

impl From<TvmazeShow> for SecondaryShow {
    fn from(show: TvmazeShow) -> Self {
        Self {
            id: show.id,
            name: show.name,
            poster_url: show.image.and_then(|i| i.best()),
        }
    }
}

/// Picks the main background image, falling back to the first background.
fn pick_backdrop(images: &[TvmazeShowImage]) -> Option<String> {
    let backgrounds: Vec<&TvmazeShowImage> = images
        .iter()
        .filter(|img| img.image_type.as_deref() == Some("background"))
        .collect();

    backgrounds
        .iter()
        .find(|img| img.main)
        .or_else(|| backgrounds.first())
        .map(|img| img.resolutions.original.url.clone())
}

#[derive(Clone)]
pub struct TvmazeClient {
    client: Client,
    base_url: String,
}

impl Default for TvmazeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TvmazeClient {
    pub fn new() -> Self {
        Self::with_config(Client::new(), TVMAZE_API)
    }

    pub fn with_config(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// GETs `path` and decodes it; a 404 means "no match" and yields `None`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(url = %url, "TVMaze returned 404");
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("TVMaze API error: {} - {}", status, body));
        }

        Ok(Some(response.json().await?))
    }

    pub async fn lookup_by_imdb(&self, imdb_id: &str) -> Result<Option<TvmazeShow>> {
        self.get_optional(&format!(
            "/lookup/shows?imdb={}",
            urlencoding::encode(imdb_id)
        ))
        .await
    }

    pub async fn lookup_by_tvdb(&self, tvdb_id: i32) -> Result<Option<TvmazeShow>> {
        self.get_optional(&format!("/lookup/shows?thetvdb={tvdb_id}"))
            .await
    }

    pub async fn single_search(&self, query: &str) -> Result<Option<TvmazeShow>> {
        self.get_optional(&format!(
            "/singlesearch/shows?q={}",
            urlencoding::encode(query)
        ))
        .await
    }

    pub async fn get_episode(
        &self,
        show_id: i32,
        season: i32,
        number: i32,
    ) -> Result<Option<TvmazeEpisode>> {
        self.get_optional(&format!(
            "/shows/{show_id}/episodebynumber?season={season}&number={number}"
        ))
        .await
    }

    pub async fn get_show_images(&self, show_id: i32) -> Result<Vec<TvmazeShowImage>> {
        Ok(self
            .get_optional(&format!("/shows/{show_id}/images"))
            .await?
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl SecondaryCatalog for TvmazeClient {
    fn name(&self) -> &'static str {
        "tvmaze"
    }

    async fn show_by_imdb(&self, imdb_id: &str) -> Result<Option<SecondaryShow>> {
        Ok(self.lookup_by_imdb(imdb_id).await?.map(SecondaryShow::from))
    }

    async fn show_by_tvdb(&self, tvdb_id: i32) -> Result<Option<SecondaryShow>> {
        Ok(self.lookup_by_tvdb(tvdb_id).await?.map(SecondaryShow::from))
    }

    async fn search_show(&self, title: &str) -> Result<Option<SecondaryShow>> {
        Ok(self.single_search(title).await?.map(SecondaryShow::from))
    }

    async fn episode_artwork(
        &self,
        show_id: i32,
        season: i32,
        episode: i32,
    ) -> Result<Option<String>> {
        Ok(self
            .get_episode(show_id, season, episode)
            .await?
            .and_then(|ep| ep.image)
            .and_then(|img| img.best()))
    }

    async fn show_backdrop(&self, show_id: i32) -> Result<Option<String>> {
        let images = self.get_show_images(show_id).await?;
        Ok(pick_backdrop(&images))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: i32, kind: &str, main: bool) -> TvmazeShowImage {
        TvmazeShowImage {
            id,
            image_type: Some(kind.to_string()),
            main,
            resolutions: TvmazeResolutions {
                original: TvmazeResolution {
                    url: format!("https://static.tvmaze.com/{id}.jpg"),
                },
            },
        }
    }

    #[test]
    fn test_backdrop_prefers_main_background() {
        let images = vec![
            image(1, "poster", true),
            image(2, "background", false),
            image(3, "background", true),
        ];
        assert_eq!(
            pick_backdrop(&images).as_deref(),
            Some("https://static.tvmaze.com/3.jpg")
        );
    }

    #[test]
    fn test_backdrop_falls_back_to_first_background() {
        let images = vec![image(1, "banner", true), image(4, "background", false)];
        assert_eq!(
            pick_backdrop(&images).as_deref(),
            Some("https://static.tvmaze.com/4.jpg")
        );
        assert_eq!(pick_backdrop(&[image(5, "poster", true)]), None);
    }

    #[test]
    fn test_episode_payload_without_image() {
        let json = r#"{"id": 1, "name": "Pilot", "season": 1, "number": 1, "image": null}"#;
        let episode: TvmazeEpisode = serde_json::from_str(json).unwrap();
        assert!(episode.image.is_none());
    }

    #[test]
    fn test_show_converts_to_secondary_show() {
        let json = r#"{
            "id": 44933,
            "name": "Severance",
            "image": {"medium": "https://m.jpg", "original": "https://o.jpg"},
            "externals": {"tvrage": null, "thetvdb": 371980, "imdb": "tt11280740"}
        }"#;
        let show: TvmazeShow = serde_json::from_str(json).unwrap();
        let secondary = SecondaryShow::from(show);
        assert_eq!(secondary.id, 44933);
        assert_eq!(secondary.poster_url.as_deref(), Some("https://o.jpg"));
    }
}
