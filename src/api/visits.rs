use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::AuthUser;
use super::validation::validate_qr_code;
use super::extract::{ApiJson, ApiPath};
use super::{ApiError, ApiResponse, AppState};
use crate::services::location_service::{Checkout, CollectibleDto, VisitDto};

#[derive(Deserialize)]
pub struct CheckInRequest {
    #[serde(default)]
    pub qr_code: String,
}

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub service_score: i16,
    pub quality_score: i16,
    pub price_score: i16,
    pub vibe_score: i16,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub review_id: i32,
}

/// POST /visits/checkin
pub async fn check_in(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<CheckInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let qr_code = validate_qr_code(&payload.qr_code)?;
    let result = state.location_service().check_in(user.id, qr_code).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

/// POST /visits/{id}/checkout
pub async fn check_out(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(visit_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<CheckoutRequest>,
) -> Result<Json<ApiResponse<CheckoutResponse>>, ApiError> {
    let checkout = Checkout {
        service_score: payload.service_score,
        quality_score: payload.quality_score,
        price_score: payload.price_score,
        vibe_score: payload.vibe_score,
        comment: payload.comment.unwrap_or_default().trim().to_string(),
    };

    let review_id = state
        .location_service()
        .check_out(user.id, visit_id, checkout)
        .await?;

    Ok(Json(ApiResponse::success(CheckoutResponse { review_id })))
}

/// GET /visits/me
pub async fn my_visits(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<VisitDto>>>, ApiError> {
    let visits = state.location_service().my_visits(user.id).await?;
    Ok(Json(ApiResponse::success(visits)))
}

/// GET /me/collectibles
pub async fn my_collectibles(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<CollectibleDto>>>, ApiError> {
    let collectibles = state.location_service().my_collectibles(user.id).await?;
    Ok(Json(ApiResponse::success(collectibles)))
}
