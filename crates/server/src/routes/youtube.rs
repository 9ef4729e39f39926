//! YouTube metadata endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tunecache_client::{EmbedCheck, SearchResponse, VideoInfo};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

pub async fn search(
    State(state): State<AppState>, Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::invalid_input("query parameter `q` is required"))?;

    Ok(Json(state.youtube.search(&query, params.limit).await?))
}

pub async fn video(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<VideoInfo>, ApiError> {
    Ok(Json(state.youtube.video(&id).await?))
}

pub async fn embed_test(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<EmbedCheck>, ApiError> {
    Ok(Json(state.youtube.embed_test(&id).await?))
}
