use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath};
use super::{ApiError, ApiResponse, AppState};
use crate::services::location_service::{FavoriteDto, FavoriteToggle};

#[derive(Deserialize)]
pub struct ToggleFavoriteRequest {
    pub location_id: i32,
}

#[derive(Serialize)]
pub struct ToggleFavoriteResponse {
    pub location_id: i32,
    pub is_favorite: bool,
}

/// POST /favorites
/// 201 when the favorite was created, 200 when an existing one was removed.
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<ToggleFavoriteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .location_service()
        .toggle_favorite(user.id, payload.location_id)
        .await?;

    let (status, is_favorite) = match outcome {
        FavoriteToggle::Added => (StatusCode::CREATED, true),
        FavoriteToggle::Removed => (StatusCode::OK, false),
    };

    Ok((
        status,
        Json(ApiResponse::success(ToggleFavoriteResponse {
            location_id: payload.location_id,
            is_favorite,
        })),
    ))
}

/// GET /favorites/me
pub async fn my_favorites(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<FavoriteDto>>>, ApiError> {
    let favorites = state.location_service().my_favorites(user.id).await?;
    Ok(Json(ApiResponse::success(favorites)))
}

/// DELETE /favorites/{location_id}
pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(location_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state
        .location_service()
        .remove_favorite(user.id, location_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
