//! Domain service for venues: browsing, check-ins, reviews and favorites.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::{LocationWithMoods, Mood};
use crate::entities::locations::LocationCategory;
use crate::entities::visits::VisitStatus;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for LocationError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for LocationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoodDto {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

impl From<Mood> for MoodDto {
    fn from(mood: Mood) -> Self {
        Self {
            id: mood.id,
            name: mood.name,
            slug: mood.slug,
        }
    }
}

/// Compact location used in listings and embedded in visits/favorites.
#[derive(Debug, Clone, Serialize)]
pub struct LocationSummary {
    pub id: i32,
    pub name: String,
    pub category: LocationCategory,
    pub city: String,
    pub image_url: String,
    /// Mood slugs.
    pub moods: Vec<String>,
    pub vibe_match_score: i32,
}

impl From<LocationWithMoods> for LocationSummary {
    fn from(row: LocationWithMoods) -> Self {
        Self {
            id: row.location.id,
            name: row.location.name,
            category: row.location.category,
            city: row.location.city,
            image_url: row.location.image_url,
            moods: row.moods.into_iter().map(|m| m.slug).collect(),
            vibe_match_score: row.location.vibe_match_score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationDetail {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: LocationCategory,
    pub city: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_url: String,
    pub moods: Vec<MoodDto>,
    /// Personal match for the caller; `None` for anonymous requests.
    pub vibe_match: Option<i32>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CheckInResult {
    pub visit_id: i32,
    pub collectible_awarded: bool,
}

/// Review submitted at checkout. Scores are checked once the visit is known to be reviewable.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub service_score: i16,
    pub quality_score: i16,
    pub price_score: i16,
    pub vibe_score: i16,
    pub comment: String,
}

impl Checkout {
    pub fn validate(&self) -> Result<(), LocationError> {
        let scores = [
            ("service_score", self.service_score),
            ("quality_score", self.quality_score),
            ("price_score", self.price_score),
            ("vibe_score", self.vibe_score),
        ];
        for (field, score) in scores {
            if !(1..=5).contains(&score) {
                return Err(LocationError::Validation(format!(
                    "{field} must be between 1 and 5"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VisitDto {
    pub id: i32,
    pub location: LocationSummary,
    pub status: VisitStatus,
    pub checked_in_at: DateTime<Utc>,
    pub checked_out_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectibleDto {
    pub id: i32,
    pub location: LocationSummary,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteDto {
    pub id: i32,
    pub location: LocationSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

#[async_trait::async_trait]
pub trait LocationService: Send + Sync {
    async fn list_moods(&self) -> Result<Vec<MoodDto>, LocationError>;

    async fn get_mood(&self, id: i32) -> Result<MoodDto, LocationError>;

    /// Approved locations, newest first, optionally filtered by mood slug.
    async fn list_locations(
        &self,
        mood_slug: Option<&str>,
    ) -> Result<Vec<LocationSummary>, LocationError>;

    /// Approved location detail; `viewer` enables the personal vibe match.
    async fn get_location(
        &self,
        id: i32,
        viewer: Option<i32>,
    ) -> Result<LocationDetail, LocationError>;

    async fn vibe_match(&self, user_id: i32, location_id: i32) -> Result<i32, LocationError>;

    /// Opens a visit for the approved location with this QR code and awards
    /// its collectible on the first visit.
    async fn check_in(&self, user_id: i32, qr_code: &str) -> Result<CheckInResult, LocationError>;

    /// Completes an active visit with a review. Returns the review id.
    ///
    /// # Errors
    ///
    /// - [`LocationError::NotFound`] for an unknown visit
    /// - [`LocationError::Forbidden`] for another user's visit
    /// - [`LocationError::Conflict`] when the visit is not active or already reviewed
    async fn check_out(
        &self,
        user_id: i32,
        visit_id: i32,
        checkout: Checkout,
    ) -> Result<i32, LocationError>;

    async fn my_visits(&self, user_id: i32) -> Result<Vec<VisitDto>, LocationError>;

    async fn my_collectibles(&self, user_id: i32) -> Result<Vec<CollectibleDto>, LocationError>;

    async fn toggle_favorite(
        &self,
        user_id: i32,
        location_id: i32,
    ) -> Result<FavoriteToggle, LocationError>;

    async fn my_favorites(&self, user_id: i32) -> Result<Vec<FavoriteDto>, LocationError>;

    /// Idempotent.
    async fn remove_favorite(&self, user_id: i32, location_id: i32) -> Result<(), LocationError>;
}
