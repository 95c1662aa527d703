use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::catalog::{SecondaryCatalog, guarded, record_outcome};

/// Result of an artwork lookup. `Absent` is a definitive answer from the
/// catalog; `Failed` means the question could not be asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtworkLookup {
    Found(String),
    Absent,
    Failed,
}

impl ArtworkLookup {
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Found(url) => Some(url),
            Self::Absent | Self::Failed => None,
        }
    }
}

/// Fetches artwork from the secondary catalog once its show id is known.
#[derive(Clone)]
pub struct EnrichmentFetcher {
    secondary: Arc<dyn SecondaryCatalog>,
    step_timeout: Duration,
}

impl EnrichmentFetcher {
    #[must_use]
    pub fn new(secondary: Arc<dyn SecondaryCatalog>, step_timeout: Duration) -> Self {
        Self {
            secondary,
            step_timeout,
        }
    }

    pub async fn fetch_artwork(
        &self,
        secondary_id: i32,
        season: i32,
        episode: i32,
    ) -> ArtworkLookup {
        let service = self.secondary.name();
        let found = guarded(
            service,
            "episode_artwork",
            self.step_timeout,
            self.secondary.episode_artwork(secondary_id, season, episode),
        )
        .await;

        match found {
            Ok(Some(url)) if !url.trim().is_empty() => {
                record_outcome(service, "episode_artwork", "hit");
                ArtworkLookup::Found(url)
            }
            Ok(_) => {
                record_outcome(service, "episode_artwork", "miss");
                debug!(secondary_id, season, episode, "Episode has no artwork");
                ArtworkLookup::Absent
            }
            Err(_) => ArtworkLookup::Failed,
        }
    }

    /// Failures and absence both come back as `None`; a backdrop is never retried
    /// within a run.
    pub async fn fetch_backdrop(&self, secondary_id: i32) -> Option<String> {
        let service = self.secondary.name();
        let found = guarded(
            service,
            "show_backdrop",
            self.step_timeout,
            self.secondary.show_backdrop(secondary_id),
        )
        .await
        .ok()?;

        record_outcome(
            service,
            "show_backdrop",
            if found.is_some() { "hit" } else { "miss" },
        );
        found.filter(|url| !url.trim().is_empty())
    }
}
