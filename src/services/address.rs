//! Turns an opaque episode reference into a stored episode and its show.
//!
//! Two shapes are accepted: an internal episode id, or the legacy composite
//! `{trakt_id}-S{season}E{episode}`.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use super::catalog::CatalogStore;
use crate::models::episode::ResolvedEpisode;

/// The only failure a caller of the pipeline ever sees.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Episode {0} not found")]
    NotFound(String),
}

/// A parsed composite reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeAddress {
    pub trakt_id: i64,
    pub season: i32,
    pub episode: i32,
}

impl CompositeAddress {
    /// Parses `{digits}-S{digits}E{digits}`. Anything else, including numbers
    /// that overflow, is simply not a composite address.
    #[must_use]
    pub fn parse(reference: &str) -> Option<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^(\d+)-S(\d+)E(\d+)$").expect("Invalid composite reference regex")
        });

        let caps = re.captures(reference.trim())?;
        Some(Self {
            trakt_id: caps.get(1)?.as_str().parse().ok()?,
            season: caps.get(2)?.as_str().parse().ok()?,
            episode: caps.get(3)?.as_str().parse().ok()?,
        })
    }
}

#[derive(Clone)]
pub struct AddressResolver {
    store: Arc<dyn CatalogStore>,
}

impl AddressResolver {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, reference: &str) -> Result<ResolvedEpisode, ResolveError> {
        let reference = reference.trim();
        let not_found = || ResolveError::NotFound(reference.to_string());

        if reference.is_empty() {
            return Err(not_found());
        }

        if let Some(episode) = read("episode_by_id", self.store.episode_by_id(reference)).await {
            let Some(show) = read("show_by_id", self.store.show_by_id(&episode.show_id)).await
            else {
                warn!(
                    episode_id = %episode.id,
                    show_id = %episode.show_id,
                    "Episode references a missing show"
                );
                return Err(not_found());
            };
            debug!(reference, "Resolved reference as internal episode id");
            return Ok(ResolvedEpisode { episode, show });
        }

        let Some(address) = CompositeAddress::parse(reference) else {
            debug!(reference, "Reference is neither an episode id nor a composite address");
            return Err(not_found());
        };

        let show = read(
            "show_by_trakt_id",
            self.store.show_by_trakt_id(address.trakt_id),
        )
        .await
        .ok_or_else(not_found)?;

        let episode = read(
            "episode_by_number",
            self.store
                .episode_by_number(&show.id, address.season, address.episode),
        )
        .await
        .ok_or_else(not_found)?;

        debug!(
            reference,
            show_id = %show.id,
            episode_id = %episode.id,
            "Resolved composite reference"
        );
        Ok(ResolvedEpisode { episode, show })
    }
}

/// Store reads that fail are logged and count as a miss.
async fn read<T, F>(what: &'static str, lookup: F) -> Option<T>
where
    F: Future<Output = anyhow::Result<Option<T>>>,
{
    match lookup.await {
        Ok(found) => found,
        Err(e) => {
            warn!(lookup = what, error = %e, "Store read failed, treating as not found");
            None
        }
    }
}
