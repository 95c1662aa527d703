#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use episoda::db::Store;
use episoda::models::{
    CanonicalEpisode, EpisodeInput, EpisodePatch, ShowInput, ShowPatch, ShowRecord,
};
use episoda::services::{
    CatalogStore, CrossReferences, PipelineSettings, PrimaryCatalog, ResolutionPipeline,
    SecondaryCatalog, SecondaryShow,
};
use tokio::sync::Notify;

pub async fn temp_store() -> Store {
    let path = std::env::temp_dir().join(format!("episoda-test-{}.db", uuid::Uuid::new_v4()));
    Store::new(&format!("sqlite:{}", path.display()))
        .await
        .expect("failed to open temp store")
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        step_timeout: Duration::from_secs(2),
        negative_cache: chrono::Duration::hours(24),
        backfill_delay: Duration::ZERO,
        max_concurrent_discoveries: 4,
    }
}

pub fn secondary_show(id: i32, name: &str) -> SecondaryShow {
    SecondaryShow {
        id,
        name: name.to_string(),
        poster_url: Some(format!("https://static.tvmaze.com/posters/{id}.jpg")),
    }
}

/// Primary catalog fake that answers from a fixed table.
#[derive(Default)]
pub struct FakePrimary {
    pub refs: Mutex<HashMap<i64, CrossReferences>>,
    pub fail: Mutex<bool>,
    /// Applied to every detail fetch before answering.
    pub delay: Mutex<Duration>,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakePrimary {
    pub fn knows(&self, trakt_id: i64, imdb_id: Option<&str>, tvdb_id: Option<i32>) {
        self.refs.lock().unwrap().insert(
            trakt_id,
            CrossReferences {
                imdb_id: imdb_id.map(str::to_string),
                tvdb_id,
            },
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most detail fetches seen in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PrimaryCatalog for FakePrimary {
    fn name(&self) -> &'static str {
        "fake-primary"
    }

    async fn cross_references(&self, trakt_id: i64) -> anyhow::Result<CrossReferences> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if *self.fail.lock().unwrap() {
            anyhow::bail!("primary catalog unavailable");
        }
        Ok(self
            .refs
            .lock()
            .unwrap()
            .get(&trakt_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Secondary catalog fake with a call log, per-step failures and scripted
/// artwork answers that can be delayed.
#[derive(Default)]
pub struct FakeSecondary {
    pub by_imdb: Mutex<HashMap<String, SecondaryShow>>,
    pub by_tvdb: Mutex<HashMap<i32, SecondaryShow>>,
    pub by_title: Mutex<HashMap<String, SecondaryShow>>,
    pub artwork: Mutex<HashMap<(i32, i32, i32), String>>,
    pub backdrops: Mutex<HashMap<i32, String>>,
    /// Popped once per artwork call before falling back to `artwork`.
    pub scripted_artwork: Mutex<VecDeque<(Duration, Option<String>)>>,
    /// Steps ("imdb", "tvdb", "search", "episode", "backdrop") that error.
    pub failing: Mutex<HashSet<&'static str>>,
    /// Steps that hang far past any step timeout.
    pub hanging: Mutex<HashSet<&'static str>>,
    /// Notified every time an artwork lookup starts.
    pub entered: Notify,
    log: Mutex<Vec<String>>,
}

impl FakeSecondary {
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn fail(&self, step: &'static str) {
        self.failing.lock().unwrap().insert(step);
    }

    pub fn hang(&self, step: &'static str) {
        self.hanging.lock().unwrap().insert(step);
    }

    async fn enter(&self, step: &'static str, detail: String) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(format!("{step}:{detail}"));
        let hangs = self.hanging.lock().unwrap().contains(step);
        if hangs {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.failing.lock().unwrap().contains(step) {
            anyhow::bail!("{step} lookup failed");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SecondaryCatalog for FakeSecondary {
    fn name(&self) -> &'static str {
        "fake-secondary"
    }

    async fn show_by_imdb(&self, imdb_id: &str) -> anyhow::Result<Option<SecondaryShow>> {
        self.enter("imdb", imdb_id.to_string()).await?;
        Ok(self.by_imdb.lock().unwrap().get(imdb_id).cloned())
    }

    async fn show_by_tvdb(&self, tvdb_id: i32) -> anyhow::Result<Option<SecondaryShow>> {
        self.enter("tvdb", tvdb_id.to_string()).await?;
        Ok(self.by_tvdb.lock().unwrap().get(&tvdb_id).cloned())
    }

    async fn search_show(&self, title: &str) -> anyhow::Result<Option<SecondaryShow>> {
        self.enter("search", title.to_string()).await?;
        Ok(self.by_title.lock().unwrap().get(title).cloned())
    }

    async fn episode_artwork(
        &self,
        show_id: i32,
        season: i32,
        episode: i32,
    ) -> anyhow::Result<Option<String>> {
        let scripted = self.scripted_artwork.lock().unwrap().pop_front();
        self.entered.notify_one();
        self.enter("episode", format!("{show_id}/{season}/{episode}"))
            .await?;

        if let Some((delay, url)) = scripted {
            tokio::time::sleep(delay).await;
            return Ok(url);
        }
        Ok(self
            .artwork
            .lock()
            .unwrap()
            .get(&(show_id, season, episode))
            .cloned())
    }

    async fn show_backdrop(&self, show_id: i32) -> anyhow::Result<Option<String>> {
        self.enter("backdrop", show_id.to_string()).await?;
        Ok(self.backdrops.lock().unwrap().get(&show_id).cloned())
    }
}

/// Store that reads through to SQLite but rejects every write.
pub struct ReadOnlyStore(pub Store);

#[async_trait::async_trait]
impl CatalogStore for ReadOnlyStore {
    async fn show_by_id(&self, id: &str) -> anyhow::Result<Option<ShowRecord>> {
        self.0.get_show(id).await
    }

    async fn show_by_trakt_id(&self, trakt_id: i64) -> anyhow::Result<Option<ShowRecord>> {
        self.0.get_show_by_trakt_id(trakt_id).await
    }

    async fn episode_by_id(&self, id: &str) -> anyhow::Result<Option<CanonicalEpisode>> {
        self.0.get_episode(id).await
    }

    async fn episode_by_number(
        &self,
        show_id: &str,
        season_number: i32,
        episode_number: i32,
    ) -> anyhow::Result<Option<CanonicalEpisode>> {
        self.0
            .get_episode_by_number(show_id, season_number, episode_number)
            .await
    }

    async fn episodes_missing_artwork(
        &self,
        show_id: &str,
    ) -> anyhow::Result<Vec<CanonicalEpisode>> {
        self.0.list_episodes_missing_artwork(show_id).await
    }

    async fn update_show(&self, _id: &str, _patch: &ShowPatch) -> anyhow::Result<bool> {
        anyhow::bail!("database is locked")
    }

    async fn update_episode(&self, _id: &str, _patch: &EpisodePatch) -> anyhow::Result<bool> {
        anyhow::bail!("database is locked")
    }
}

pub struct Harness {
    pub store: Store,
    pub primary: Arc<FakePrimary>,
    pub secondary: Arc<FakeSecondary>,
    pub pipeline: Arc<ResolutionPipeline>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_settings(settings()).await
    }

    pub async fn with_settings(settings: PipelineSettings) -> Self {
        Self::build(settings, false).await
    }

    /// Pipeline whose every store write fails; `store` still seeds and reads.
    pub async fn with_failing_writes() -> Self {
        Self::build(settings(), true).await
    }

    async fn build(settings: PipelineSettings, failing_writes: bool) -> Self {
        let store = temp_store().await;
        let primary = Arc::new(FakePrimary::default());
        let secondary = Arc::new(FakeSecondary::default());
        let pipeline_store: Arc<dyn CatalogStore> = if failing_writes {
            Arc::new(ReadOnlyStore(store.clone()))
        } else {
            Arc::new(store.clone())
        };
        let pipeline = Arc::new(ResolutionPipeline::new(
            pipeline_store,
            primary.clone(),
            secondary.clone(),
            settings,
        ));

        Self {
            store,
            primary,
            secondary,
            pipeline,
        }
    }

    pub async fn seed_show(&self, input: ShowInput) -> ShowRecord {
        self.store.seed_show(&input).await.expect("seed show")
    }

    pub async fn seed_episode(
        &self,
        show: &ShowRecord,
        season: i32,
        number: i32,
        artwork_url: Option<&str>,
    ) -> CanonicalEpisode {
        self.store
            .seed_episode(
                &show.id,
                &EpisodeInput {
                    season_number: season,
                    episode_number: number,
                    title: format!("Episode {number}"),
                    rating: Some(8.1),
                    artwork_url: artwork_url.map(str::to_string),
                    ..EpisodeInput::default()
                },
            )
            .await
            .expect("seed episode")
    }

    pub async fn reload_show(&self, id: &str) -> ShowRecord {
        self.store.get_show(id).await.unwrap().expect("show exists")
    }

    pub async fn reload_episode(&self, id: &str) -> CanonicalEpisode {
        self.store
            .get_episode(id)
            .await
            .unwrap()
            .expect("episode exists")
    }
}
