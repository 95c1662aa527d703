use std::sync::Arc;

use tracing::{debug, info, warn};

use super::catalog::CatalogStore;
use crate::models::episode::EpisodePatch;
use crate::models::show::ShowPatch;

/// Writes newly learned identifiers and artwork back to the store.
///
/// Patches are normalized before writing and the store only updates the
/// columns a patch carries, so concurrent writers that learned the same value
/// converge on the same row and a blank value never replaces a known one.
/// Write failures are logged and swallowed: they only cost a future cache hit.
#[derive(Clone)]
pub struct BackfillWriter {
    store: Arc<dyn CatalogStore>,
}

impl BackfillWriter {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn persist(
        &self,
        show: Option<(&str, ShowPatch)>,
        episode: Option<(&str, EpisodePatch)>,
    ) {
        if let Some((show_id, patch)) = show {
            self.persist_show(show_id, patch).await;
        }
        if let Some((episode_id, patch)) = episode {
            self.persist_episode(episode_id, patch).await;
        }
    }

    pub async fn persist_show(&self, show_id: &str, patch: ShowPatch) -> bool {
        let patch = patch.normalized();
        if patch.is_empty() {
            return false;
        }

        match self.store.update_show(show_id, &patch).await {
            Ok(written) => {
                debug!(show_id, ?patch, written, "Backfilled show");
                written
            }
            Err(e) => {
                warn!(show_id, error = %e, "Failed to backfill show");
                false
            }
        }
    }

    pub async fn persist_episode(&self, episode_id: &str, patch: EpisodePatch) -> bool {
        let patch = patch.normalized();
        if patch.is_empty() {
            return false;
        }

        match self.store.update_episode(episode_id, &patch).await {
            Ok(written) => {
                if written && patch.artwork_url.is_some() {
                    metrics::counter!("artwork_backfills_total").increment(1);
                    info!(
                        episode_id,
                        artwork_url = ?patch.artwork_url,
                        "Backfilled episode artwork"
                    );
                } else {
                    debug!(episode_id, ?patch, written, "Backfilled episode");
                }
                written
            }
            Err(e) => {
                warn!(episode_id, error = %e, "Failed to backfill episode");
                false
            }
        }
    }
}
