//! Seams between the resolution pipeline and the systems it talks to.
//!
//! The pipeline only ever sees these traits, so the record store and both
//! catalogs can be swapped for in-process fakes.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tracing::warn;

use crate::models::episode::{CanonicalEpisode, EpisodePatch};
use crate::models::show::{ShowPatch, ShowRecord};

/// Cross-reference ids reported by the primary catalog for one show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossReferences {
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<i32>,
}

impl CrossReferences {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.imdb_id.is_none() && self.tvdb_id.is_none()
    }
}

/// A show as matched in the secondary catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryShow {
    pub id: i32,
    pub name: String,
    pub poster_url: Option<String>,
}

/// Read and enrich access to stored shows and episodes.
///
/// Updates only touch the columns a patch carries and report whether a row
/// was written.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn show_by_id(&self, id: &str) -> Result<Option<ShowRecord>>;

    async fn show_by_trakt_id(&self, trakt_id: i64) -> Result<Option<ShowRecord>>;

    async fn episode_by_id(&self, id: &str) -> Result<Option<CanonicalEpisode>>;

    async fn episode_by_number(
        &self,
        show_id: &str,
        season_number: i32,
        episode_number: i32,
    ) -> Result<Option<CanonicalEpisode>>;

    async fn episodes_missing_artwork(&self, show_id: &str) -> Result<Vec<CanonicalEpisode>>;

    async fn update_show(&self, id: &str, patch: &ShowPatch) -> Result<bool>;

    async fn update_episode(&self, id: &str, patch: &EpisodePatch) -> Result<bool>;
}

/// The catalog that owns a show's canonical numeric id.
#[async_trait::async_trait]
pub trait PrimaryCatalog: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches full show detail and returns the IMDb/TVDB ids it carries.
    /// An unknown show yields empty references rather than an error.
    async fn cross_references(&self, trakt_id: i64) -> Result<CrossReferences>;
}

/// The catalog episode artwork comes from. Every lookup returns `None` for
/// "no match"; errors are reserved for transport and decoding failures.
#[async_trait::async_trait]
pub trait SecondaryCatalog: Send + Sync {
    fn name(&self) -> &'static str;

    async fn show_by_imdb(&self, imdb_id: &str) -> Result<Option<SecondaryShow>>;

    async fn show_by_tvdb(&self, tvdb_id: i32) -> Result<Option<SecondaryShow>>;

    async fn search_show(&self, title: &str) -> Result<Option<SecondaryShow>>;

    async fn episode_artwork(
        &self,
        show_id: i32,
        season: i32,
        episode: i32,
    ) -> Result<Option<String>>;

    async fn show_backdrop(&self, show_id: i32) -> Result<Option<String>>;
}

/// A failed external catalog call. Never surfaced past the pipeline.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{service} timed out during {step}")]
    Timeout {
        service: &'static str,
        step: &'static str,
    },

    #[error("{service} request failed during {step}: {message}")]
    Service {
        service: &'static str,
        step: &'static str,
        message: String,
    },
}

pub(crate) fn record_outcome(service: &'static str, step: &'static str, outcome: &'static str) {
    metrics::counter!(
        "catalog_requests_total",
        "service" => service,
        "step" => step,
        "outcome" => outcome
    )
    .increment(1);
}

/// Runs one external call under `timeout`, converting timeouts and errors
/// into [`CatalogError`] and counting them. Successful calls are counted by
/// the caller, which knows whether the answer was a hit or a miss.
pub(crate) async fn guarded<T, F>(
    service: &'static str,
    step: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T, CatalogError>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            record_outcome(service, step, "error");
            warn!(service, step, error = %e, "Catalog call failed");
            Err(CatalogError::Service {
                service,
                step,
                message: e.to_string(),
            })
        }
        Err(_) => {
            record_outcome(service, step, "timeout");
            warn!(
                service,
                step,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Catalog call timed out"
            );
            Err(CatalogError::Timeout { service, step })
        }
    }
}
