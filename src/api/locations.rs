use axum::{
    Json,
    extract::State,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::{AuthUser, OptionalUser};
use super::extract::{ApiPath, ApiQuery};
use super::{ApiError, ApiResponse, AppState};
use crate::services::location_service::{LocationDetail, LocationSummary, MoodDto};

#[derive(Deserialize)]
pub struct LocationQuery {
    pub mood: Option<String>,
}

#[derive(Serialize)]
pub struct VibeMatchResponse {
    pub location_id: i32,
    pub vibe_match: i32,
}

/// GET /moods
pub async fn list_moods(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<MoodDto>>>, ApiError> {
    let moods = state.location_service().list_moods().await?;
    Ok(Json(ApiResponse::success(moods)))
}

/// GET /moods/{id}
pub async fn get_mood(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ApiResponse<MoodDto>>, ApiError> {
    let mood = state.location_service().get_mood(id).await?;
    Ok(Json(ApiResponse::success(mood)))
}

/// GET /locations?mood=<slug>
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LocationQuery>,
) -> Result<Json<ApiResponse<Vec<LocationSummary>>>, ApiError> {
    let mood = query
        .mood
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    let locations = state.location_service().list_locations(mood).await?;
    Ok(Json(ApiResponse::success(locations)))
}

/// GET /locations/{id}
pub async fn get_location(
    State(state): State<Arc<AppState>>,
    OptionalUser(viewer): OptionalUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ApiResponse<LocationDetail>>, ApiError> {
    let detail = state
        .location_service()
        .get_location(id, viewer.map(|u| u.id))
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// GET /locations/{id}/vibe-match
pub async fn vibe_match(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ApiResponse<VibeMatchResponse>>, ApiError> {
    let score = state.location_service().vibe_match(user.id, id).await?;
    Ok(Json(ApiResponse::success(VibeMatchResponse {
        location_id: id,
        vibe_match: score,
    })))
}
