//! The single resolution pipeline and the orchestrator that feeds its results
//! into the shared view slot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};

use super::address::{AddressResolver, ResolveError};
use super::backfill::BackfillWriter;
use super::catalog::{CatalogStore, PrimaryCatalog, SecondaryCatalog};
use super::enrichment::{ArtworkLookup, EnrichmentFetcher};
use super::waterfall::{Discovery, IdentityWaterfall};
use crate::config::ResolutionConfig;
use crate::models::episode::{CanonicalEpisode, EpisodePatch, ResolvedEpisode};
use crate::models::show::{ShowPatch, ShowRecord};

/// What triggered a run. Only affects the loading indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    #[default]
    Initial,
    Manual,
    Silent,
}

impl RefreshMode {
    #[must_use]
    pub const fn shows_loading_indicator(self) -> bool {
        matches!(self, Self::Initial | Self::Manual)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Manual => "manual",
            Self::Silent => "silent",
        }
    }
}

impl std::str::FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initial" => Ok(Self::Initial),
            "manual" => Ok(Self::Manual),
            "silent" => Ok(Self::Silent),
            other => Err(format!("unknown refresh mode: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub step_timeout: Duration,
    pub negative_cache: chrono::Duration,
    pub backfill_delay: Duration,
    pub max_concurrent_discoveries: usize,
}

impl From<&ResolutionConfig> for PipelineSettings {
    fn from(config: &ResolutionConfig) -> Self {
        Self {
            step_timeout: Duration::from_secs(config.step_timeout_seconds),
            negative_cache: chrono::Duration::hours(i64::from(config.negative_cache_hours)),
            backfill_delay: Duration::from_millis(config.backfill_delay_ms),
            max_concurrent_discoveries: config.max_concurrent_discoveries,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ResolutionConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub episodes_checked: usize,
    pub artwork_found: usize,
    pub secondary_id: Option<i32>,
}

/// A discovery shared by every run that asks about the same show while it is
/// still in flight.
type SharedDiscovery = Arc<OnceCell<(Discovery, ShowRecord)>>;

/// Resolve, discover, enrich, persist. The same sequence for every trigger.
#[derive(Clone)]
pub struct ResolutionPipeline {
    store: Arc<dyn CatalogStore>,
    resolver: AddressResolver,
    waterfall: IdentityWaterfall,
    enrichment: EnrichmentFetcher,
    writer: BackfillWriter,
    settings: PipelineSettings,
    in_flight: Arc<Mutex<HashMap<String, SharedDiscovery>>>,
    discovery_permits: Arc<Semaphore>,
}

impl ResolutionPipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn CatalogStore>,
        primary: Arc<dyn PrimaryCatalog>,
        secondary: Arc<dyn SecondaryCatalog>,
        settings: PipelineSettings,
    ) -> Self {
        let writer = BackfillWriter::new(store.clone());
        Self {
            resolver: AddressResolver::new(store.clone()),
            waterfall: IdentityWaterfall::new(
                primary,
                secondary.clone(),
                writer.clone(),
                settings.step_timeout,
            ),
            enrichment: EnrichmentFetcher::new(secondary, settings.step_timeout),
            writer,
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            discovery_permits: Arc::new(Semaphore::new(
                settings.max_concurrent_discoveries.max(1),
            )),
            settings,
        }
    }

    pub async fn resolve(&self, reference: &str) -> Result<ResolvedEpisode, ResolveError> {
        let ResolvedEpisode {
            mut episode,
            mut show,
        } = self.resolver.resolve(reference).await?;

        if episode.has_artwork() {
            debug!(episode_id = %episode.id, "Artwork already stored");
            return Ok(ResolvedEpisode { episode, show });
        }

        if episode.artwork_absence_is_fresh(self.settings.negative_cache, Utc::now()) {
            debug!(
                episode_id = %episode.id,
                checked_at = ?episode.artwork_checked_at,
                "Artwork recently confirmed absent, skipping lookup"
            );
            return Ok(ResolvedEpisode { episode, show });
        }

        let discovery = self.discover_show(&mut show).await;
        let Some(secondary_id) = discovery.matched else {
            if !discovery.degraded {
                self.mark_absent(&mut episode).await;
            }
            return Ok(ResolvedEpisode { episode, show });
        };

        self.enrich_episode(secondary_id, &mut episode).await;

        Ok(ResolvedEpisode { episode, show })
    }

    /// Backfills artwork for every episode of a show that lacks it.
    pub async fn backfill_show(&self, show_id: &str) -> Result<BackfillReport, ResolveError> {
        let not_found = || ResolveError::NotFound(show_id.to_string());
        let mut show = match self.store.show_by_id(show_id).await {
            Ok(Some(show)) => show,
            Ok(None) => return Err(not_found()),
            Err(e) => {
                warn!(show_id, error = %e, "Failed to load show for backfill");
                return Err(not_found());
            }
        };

        let discovery = self.discover_show(&mut show).await;
        let mut report = BackfillReport {
            secondary_id: discovery.matched,
            ..BackfillReport::default()
        };
        let Some(secondary_id) = discovery.matched else {
            return Ok(report);
        };

        let episodes = self
            .store
            .episodes_missing_artwork(show_id)
            .await
            .unwrap_or_else(|e| {
                warn!(show_id, error = %e, "Failed to list episodes missing artwork");
                Vec::new()
            });

        let now = Utc::now();
        let pending = episodes
            .into_iter()
            .filter(|ep| !ep.artwork_absence_is_fresh(self.settings.negative_cache, now));

        for (i, mut episode) in pending.enumerate() {
            if i > 0 && !self.settings.backfill_delay.is_zero() {
                tokio::time::sleep(self.settings.backfill_delay).await;
            }
            report.episodes_checked += 1;
            if let ArtworkLookup::Found(_) = self.enrich_episode(secondary_id, &mut episode).await {
                report.artwork_found += 1;
            }
        }

        info!(
            show_id,
            secondary_id,
            episodes_checked = report.episodes_checked,
            artwork_found = report.artwork_found,
            "Show artwork backfill finished"
        );

        Ok(report)
    }

    /// Runs the waterfall, plus the backdrop fetch on a fresh match, once per
    /// show no matter how many runs ask at the same time. Runs that arrive
    /// while a discovery is in flight wait for it and take its result.
    async fn discover_show(&self, show: &mut ShowRecord) -> Discovery {
        if show.tvmaze_id.is_some() {
            return self.waterfall.discover(show).await;
        }

        let cell = self
            .lock_in_flight()
            .entry(show.id.clone())
            .or_default()
            .clone();

        let leader_copy = show.clone();
        let (discovery, discovered) = cell
            .get_or_init(|| async move {
                let _permit = self.discovery_permits.acquire().await.ok();
                let mut show = leader_copy;
                let discovery = self.waterfall.discover(&mut show).await;
                if let Some(secondary_id) = discovery.matched.filter(|_| discovery.is_fresh()) {
                    self.backfill_backdrop(secondary_id, &mut show).await;
                }
                (discovery, show)
            })
            .await
            .clone();

        {
            let mut in_flight = self.lock_in_flight();
            if in_flight
                .get(&show.id)
                .is_some_and(|current| Arc::ptr_eq(current, &cell))
            {
                in_flight.remove(&show.id);
            }
        }

        *show = discovered;
        discovery
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashMap<String, SharedDiscovery>> {
        self.in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn enrich_episode(
        &self,
        secondary_id: i32,
        episode: &mut CanonicalEpisode,
    ) -> ArtworkLookup {
        let lookup = self
            .enrichment
            .fetch_artwork(secondary_id, episode.season_number, episode.episode_number)
            .await;

        match &lookup {
            ArtworkLookup::Found(url) => {
                self.writer
                    .persist_episode(&episode.id, EpisodePatch::artwork(url.clone()))
                    .await;
                episode.artwork_url = Some(url.clone());
            }
            ArtworkLookup::Absent => self.mark_absent(episode).await,
            ArtworkLookup::Failed => {}
        }

        lookup
    }

    async fn mark_absent(&self, episode: &mut CanonicalEpisode) {
        if self.settings.negative_cache <= chrono::Duration::zero() {
            return;
        }
        let patch = EpisodePatch::confirmed_absent(Utc::now());
        episode.artwork_checked_at.clone_from(&patch.artwork_checked_at);
        self.writer.persist_episode(&episode.id, patch).await;
    }

    async fn backfill_backdrop(&self, secondary_id: i32, show: &mut ShowRecord) {
        if show.backdrop_url.is_some() {
            return;
        }
        let Some(backdrop_url) = self.enrichment.fetch_backdrop(secondary_id).await else {
            return;
        };
        let patch = ShowPatch {
            backdrop_url: Some(backdrop_url),
            ..ShowPatch::default()
        };
        self.writer
            .persist(Some((show.id.as_str(), patch.clone())), None)
            .await;
        show.apply(&patch);
    }
}

/// Final outcome of a run as shown to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ViewResult {
    Resolved(ResolvedEpisode),
    NotFound,
}

impl From<&Result<ResolvedEpisode, ResolveError>> for ViewResult {
    fn from(result: &Result<ResolvedEpisode, ResolveError>) -> Self {
        match result {
            Ok(resolved) => Self::Resolved(resolved.clone()),
            Err(ResolveError::NotFound(_)) => Self::NotFound,
        }
    }
}

/// Snapshot of the shared view slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub reference: Option<String>,
    pub token: u64,
    pub loading: bool,
    pub result: Option<ViewResult>,
}

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Runs the pipeline for every trigger and reconciles overlapping runs.
///
/// Each run takes a token from a process-wide counter. A finished run writes
/// its result to the view slot only if its token is still the latest one
/// issued for the slot's reference; older completions are dropped. In-flight
/// catalog calls of a superseded run are not cancelled.
#[derive(Clone)]
pub struct RefreshOrchestrator {
    pipeline: Arc<ResolutionPipeline>,
    view: Arc<Mutex<ViewState>>,
}

impl RefreshOrchestrator {
    #[must_use]
    pub fn new(pipeline: Arc<ResolutionPipeline>) -> Self {
        Self {
            pipeline,
            view: Arc::new(Mutex::new(ViewState::default())),
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &ResolutionPipeline {
        &self.pipeline
    }

    /// Runs the pipeline and returns this run's own result, whether or not it
    /// made it into the view slot.
    pub async fn run(
        &self,
        reference: &str,
        mode: RefreshMode,
    ) -> Result<ResolvedEpisode, ResolveError> {
        let start = Instant::now();
        let reference = reference.trim();
        let token = self.issue_token(reference, mode);

        let result = self.pipeline.resolve(reference).await;
        let applied = self.complete(token, &result);

        info!(
            event = "episode_resolution_finished",
            reference,
            mode = mode.as_str(),
            token,
            applied,
            found = result.is_ok(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
        );

        result
    }

    #[must_use]
    pub fn view(&self) -> ViewState {
        self.lock_view().clone()
    }

    fn issue_token(&self, reference: &str, mode: RefreshMode) -> u64 {
        let mut view = self.lock_view();
        let token = NEXT_TOKEN.fetch_add(1, Ordering::SeqCst);

        if view.reference.as_deref() != Some(reference) {
            *view = ViewState {
                reference: Some(reference.to_string()),
                ..ViewState::default()
            };
        }
        view.token = token;
        if mode.shows_loading_indicator() {
            view.loading = true;
        }

        token
    }

    fn complete(&self, token: u64, result: &Result<ResolvedEpisode, ResolveError>) -> bool {
        let mut view = self.lock_view();
        if view.token != token {
            metrics::counter!("stale_runs_discarded_total").increment(1);
            debug!(token, latest = view.token, "Discarding stale run result");
            return false;
        }

        view.result = Some(ViewResult::from(result));
        view.loading = false;
        true
    }

    fn lock_view(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.view
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
