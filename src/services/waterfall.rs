//! Secondary catalog id discovery.
//!
//! Shows arrive with different subsets of cross-catalog ids depending on how
//! they were ingested. The waterfall tries the cheapest, most specific lookup
//! first and stops at the first match; everything learned along the way is
//! written back immediately so later runs start further down the list.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::backfill::BackfillWriter;
use super::catalog::{
    CatalogError, PrimaryCatalog, SecondaryCatalog, SecondaryShow, guarded, record_outcome,
};
use crate::models::show::{ShowPatch, ShowRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Cached,
    ImdbLookup,
    TvdbLookup,
    PrimaryCrossReference,
    TitleSearch,
}

impl Strategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::ImdbLookup => "imdb_lookup",
            Self::TvdbLookup => "tvdb_lookup",
            Self::PrimaryCrossReference => "primary_cross_reference",
            Self::TitleSearch => "title_search",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub const STRATEGIES: [Strategy; 5] = [
    Strategy::Cached,
    Strategy::ImdbLookup,
    Strategy::TvdbLookup,
    Strategy::PrimaryCrossReference,
    Strategy::TitleSearch,
];

/// Lookups retried once the primary catalog has reported new ids.
const AFTER_CROSS_REFERENCE: [Strategy; 2] = [Strategy::ImdbLookup, Strategy::TvdbLookup];

/// Outcome of one waterfall run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub matched: Option<i32>,
    pub strategy: Option<Strategy>,
    /// At least one step failed (timeout or error) rather than missed.
    pub degraded: bool,
}

impl Discovery {
    /// Whether the id was learned by this run instead of read from the record.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.matched.is_some() && self.strategy != Some(Strategy::Cached)
    }
}

enum Step {
    Hit(i32),
    Learned,
    Miss,
    Skipped,
    Failed,
}

#[derive(Clone)]
pub struct IdentityWaterfall {
    primary: Arc<dyn PrimaryCatalog>,
    secondary: Arc<dyn SecondaryCatalog>,
    writer: BackfillWriter,
    step_timeout: Duration,
}

impl IdentityWaterfall {
    #[must_use]
    pub fn new(
        primary: Arc<dyn PrimaryCatalog>,
        secondary: Arc<dyn SecondaryCatalog>,
        writer: BackfillWriter,
        step_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            writer,
            step_timeout,
        }
    }

    /// Discovers the secondary catalog id for `show`.
    ///
    /// `show` is updated in place with every value that was persisted, so the
    /// caller's copy matches the store afterwards. Exhausting every strategy
    /// is a normal outcome and yields `matched: None`.
    pub async fn discover(&self, show: &mut ShowRecord) -> Discovery {
        let mut discovery = Discovery::default();
        let mut queue: VecDeque<Strategy> = STRATEGIES.into_iter().collect();

        while let Some(strategy) = queue.pop_front() {
            match self.run_step(strategy, show).await {
                Step::Hit(id) => {
                    discovery.matched = Some(id);
                    discovery.strategy = Some(strategy);
                    break;
                }
                Step::Learned => {
                    for retry in AFTER_CROSS_REFERENCE.into_iter().rev() {
                        queue.push_front(retry);
                    }
                }
                Step::Failed => discovery.degraded = true,
                Step::Miss | Step::Skipped => {}
            }
        }

        match discovery.strategy {
            Some(strategy) => info!(
                show_id = %show.id,
                trakt_id = show.trakt_id,
                secondary_id = ?discovery.matched,
                %strategy,
                "Secondary catalog id discovered"
            ),
            None => info!(
                show_id = %show.id,
                trakt_id = show.trakt_id,
                degraded = discovery.degraded,
                "Secondary catalog id not found"
            ),
        }

        discovery
    }

    async fn run_step(&self, strategy: Strategy, show: &mut ShowRecord) -> Step {
        match strategy {
            Strategy::Cached => show.tvmaze_id.map_or(Step::Skipped, |id| {
                debug!(show_id = %show.id, secondary_id = id, "Secondary id already cached");
                Step::Hit(id)
            }),
            Strategy::ImdbLookup => {
                let Some(imdb_id) = show.imdb_id.clone() else {
                    return Step::Skipped;
                };
                let found = guarded(
                    self.secondary.name(),
                    strategy.label(),
                    self.step_timeout,
                    self.secondary.show_by_imdb(&imdb_id),
                )
                .await;
                self.accept_match(strategy, show, found).await
            }
            Strategy::TvdbLookup => {
                let Some(tvdb_id) = show.tvdb_id else {
                    return Step::Skipped;
                };
                let found = guarded(
                    self.secondary.name(),
                    strategy.label(),
                    self.step_timeout,
                    self.secondary.show_by_tvdb(tvdb_id),
                )
                .await;
                self.accept_match(strategy, show, found).await
            }
            Strategy::PrimaryCrossReference => self.fetch_cross_references(show).await,
            Strategy::TitleSearch => {
                if show.title.trim().is_empty() {
                    return Step::Skipped;
                }
                let title = show.title.clone();
                let found = guarded(
                    self.secondary.name(),
                    strategy.label(),
                    self.step_timeout,
                    self.secondary.search_show(&title),
                )
                .await;
                self.accept_match(strategy, show, found).await
            }
        }
    }

    async fn accept_match(
        &self,
        strategy: Strategy,
        show: &mut ShowRecord,
        found: Result<Option<SecondaryShow>, CatalogError>,
    ) -> Step {
        let service = self.secondary.name();
        match found {
            Ok(Some(matched)) => {
                record_outcome(service, strategy.label(), "hit");
                debug!(
                    show_id = %show.id,
                    %strategy,
                    secondary_id = matched.id,
                    secondary_title = %matched.name,
                    "Secondary catalog match"
                );
                let patch = ShowPatch {
                    tvmaze_id: Some(matched.id),
                    poster_url: if show.poster_url.is_none() {
                        matched.poster_url
                    } else {
                        None
                    },
                    ..ShowPatch::default()
                };
                self.writer.persist_show(&show.id, patch.clone()).await;
                show.apply(&patch.normalized());
                Step::Hit(matched.id)
            }
            Ok(None) => {
                record_outcome(service, strategy.label(), "miss");
                debug!(show_id = %show.id, %strategy, "No secondary catalog match");
                Step::Miss
            }
            Err(_) => Step::Failed,
        }
    }

    /// Asks the primary catalog for IMDb/TVDB ids. Runs at most once per show:
    /// the fetch is marked on the record even when nothing came back.
    async fn fetch_cross_references(&self, show: &mut ShowRecord) -> Step {
        if !show.lacks_cross_references() {
            return Step::Skipped;
        }
        if show.cross_refs_fetched_at.is_some() {
            debug!(show_id = %show.id, "Cross references already fetched");
            return Step::Skipped;
        }

        let service = self.primary.name();
        let step = Strategy::PrimaryCrossReference.label();
        let Ok(refs) = guarded(
            service,
            step,
            self.step_timeout,
            self.primary.cross_references(show.trakt_id),
        )
        .await
        else {
            return Step::Failed;
        };

        record_outcome(service, step, if refs.is_empty() { "miss" } else { "hit" });

        let patch = ShowPatch {
            imdb_id: refs.imdb_id,
            tvdb_id: refs.tvdb_id,
            cross_refs_fetched_at: Some(chrono::Utc::now().to_rfc3339()),
            ..ShowPatch::default()
        }
        .normalized();
        self.writer.persist_show(&show.id, patch.clone()).await;
        show.apply(&patch);

        if show.lacks_cross_references() {
            debug!(show_id = %show.id, "Primary catalog knows no cross references");
            Step::Miss
        } else {
            info!(
                show_id = %show.id,
                imdb_id = ?show.imdb_id,
                tvdb_id = ?show.tvdb_id,
                "Learned cross references from primary catalog"
            );
            Step::Learned
        }
    }
}
