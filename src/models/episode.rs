use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::show::ShowRecord;

/// The locally stored episode, addressed by its internal id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEpisode {
    pub id: String,
    pub show_id: String,
    pub season_number: i32,
    pub episode_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub rating: Option<f32>,
    pub artwork_url: Option<String>,
    pub artwork_checked_at: Option<String>,
}

impl CanonicalEpisode {
    #[must_use]
    pub const fn has_artwork(&self) -> bool {
        self.artwork_url.is_some()
    }

    /// Whether a previous lookup confirmed the artwork absent less than `ttl` ago.
    ///
    /// A zero `ttl` disables the check entirely.
    #[must_use]
    pub fn artwork_absence_is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        if ttl <= Duration::zero() {
            return false;
        }

        self.artwork_checked_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .is_some_and(|checked| now - checked.with_timezone(&Utc) < ttl)
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!("S{}E{}", self.season_number, self.episode_number)
    }
}

/// Ingestion-side input used to seed an episode row.
#[derive(Debug, Clone, Default)]
pub struct EpisodeInput {
    pub season_number: i32,
    pub episode_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub rating: Option<f32>,
    pub artwork_url: Option<String>,
}

/// Newly discovered episode-level values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodePatch {
    pub artwork_url: Option<String>,
    pub artwork_checked_at: Option<String>,
}

impl EpisodePatch {
    #[must_use]
    pub fn artwork(url: impl Into<String>) -> Self {
        Self {
            artwork_url: Some(url.into()),
            artwork_checked_at: None,
        }
    }

    #[must_use]
    pub fn confirmed_absent(at: DateTime<Utc>) -> Self {
        Self {
            artwork_url: None,
            artwork_checked_at: Some(at.to_rfc3339()),
        }
    }

    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            artwork_url: self.artwork_url.filter(|s| !s.trim().is_empty()),
            ..self
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.artwork_url.is_none() && self.artwork_checked_at.is_none()
    }
}

/// An episode together with the show it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEpisode {
    pub episode: CanonicalEpisode,
    pub show: ShowRecord,
}
