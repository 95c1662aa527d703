use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clients::trakt::TraktClient;
use crate::clients::tvmaze::TvmazeClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    CatalogStore, PipelineSettings, PrimaryCatalog, RefreshOrchestrator, ResolutionPipeline,
    SecondaryCatalog,
};

/// Build a shared HTTP client with reasonable defaults for API calls.
/// This client should be reused across all requests to the same catalog to
/// enable connection pooling.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Episoda/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub pipeline: Arc<ResolutionPipeline>,

    pub orchestrator: RefreshOrchestrator,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        if config.trakt.client_id.is_empty() {
            tracing::warn!(
                "No Trakt client id configured; cross-reference lookups will be rejected"
            );
        }

        let trakt = Arc::new(TraktClient::with_config(
            build_shared_http_client(config.trakt.request_timeout_seconds)?,
            config.trakt.base_url.clone(),
            config.trakt.client_id.clone(),
        ));
        let tvmaze = Arc::new(TvmazeClient::with_config(
            build_shared_http_client(config.tvmaze.request_timeout_seconds)?,
            config.tvmaze.base_url.clone(),
        ));

        Ok(Self::with_catalogs(config, store, trakt, tvmaze))
    }

    /// Wires the pipeline over an already opened store and arbitrary catalogs.
    #[must_use]
    pub fn with_catalogs(
        config: Config,
        store: Store,
        primary: Arc<dyn PrimaryCatalog>,
        secondary: Arc<dyn SecondaryCatalog>,
    ) -> Self {
        let settings = PipelineSettings::from(&config.resolution);
        let pipeline = Arc::new(ResolutionPipeline::new(
            Arc::new(store.clone()) as Arc<dyn CatalogStore>,
            primary,
            secondary,
            settings,
        ));
        let orchestrator = RefreshOrchestrator::new(pipeline.clone());

        Self {
            config: Arc::new(RwLock::new(config)),
            store,
            pipeline,
            orchestrator,
        }
    }
}
