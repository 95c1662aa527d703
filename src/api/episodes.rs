use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, EpisodeQuery, EpisodeResponse};
use crate::services::{BackfillReport, RefreshMode, ViewState};

/// `GET /api/episodes/{reference}?mode=initial|manual|silent`
pub async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
    Query(query): Query<EpisodeQuery>,
) -> Result<Json<ApiResponse<EpisodeResponse>>, ApiError> {
    let mode = match query.mode.as_deref() {
        Some(raw) => raw.parse::<RefreshMode>().map_err(ApiError::validation)?,
        None => RefreshMode::default(),
    };

    let resolved = state.shared.orchestrator.run(&reference, mode).await?;

    Ok(Json(ApiResponse::success(EpisodeResponse {
        episode: resolved.episode,
        show: resolved.show,
        mode,
        loading: mode.shows_loading_indicator(),
    })))
}

/// `GET /api/view`
pub async fn get_view(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ViewState>> {
    Json(ApiResponse::success(state.shared.orchestrator.view()))
}

/// `POST /api/shows/{id}/artwork/backfill`
pub async fn backfill_show_artwork(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<String>,
) -> Result<Json<ApiResponse<BackfillReport>>, ApiError> {
    let report = state.shared.pipeline.backfill_show(&show_id).await?;
    Ok(Json(ApiResponse::success(report)))
}
