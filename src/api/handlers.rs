use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::{CacheState, ResultCache};
use crate::error::ToplyticsError;
use crate::models::{RankingEntry, TimeWindow};

pub const DEFAULT_POSTS: usize = 5;
pub const MIN_POSTS: usize = 1;
pub const MAX_POSTS: usize = 25;

pub struct AppState {
    pub cache: Arc<ResultCache>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct RankingQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_POSTS
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RankingResponse {
    pub window: String,
    pub entries: Vec<RankingEntry>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WindowSummary {
    pub window: TimeWindow,
    pub entries: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub view_id: String,
    pub computed_at: DateTime<Utc>,
    pub windows: Vec<WindowSummary>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub cache: CacheState,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: ToplyticsError) -> ApiError {
    let status = match &err {
        ToplyticsError::UnknownWindow(_) => StatusCode::NOT_FOUND,
        ToplyticsError::NoSelectedView => StatusCode::CONFLICT,
        ToplyticsError::NoCachedData | ToplyticsError::RemoteUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ToplyticsError::RemoteEmpty(_) => StatusCode::BAD_GATEWAY,
        ToplyticsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Top entries of one window's ranking
pub async fn get_ranking(
    State(state): State<Arc<AppState>>,
    Path(window): Path<String>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<RankingResponse>, ApiError> {
    let limit = query.limit.clamp(MIN_POSTS, MAX_POSTS);

    let mut entries = state
        .cache
        .get_ranking(&window)
        .await
        .map_err(error_response)?;
    entries.truncate(limit);

    Ok(Json(RankingResponse {
        window,
        total: entries.len(),
        entries,
    }))
}

/// Force a refresh of every window
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<RefreshResponse>, ApiError> {
    let result = state.cache.refresh_now().await.map_err(error_response)?;

    Ok(Json(RefreshResponse {
        view_id: result.view_id.clone(),
        computed_at: result.computed_at,
        windows: result
            .rankings
            .iter()
            .map(|(window, entries)| WindowSummary {
                window: *window,
                entries: entries.len(),
            })
            .collect(),
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        cache: state.cache.state().await,
    })
}
