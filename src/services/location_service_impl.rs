//! `SeaORM` implementation of the `LocationService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{NewReview, Store};
use crate::entities::visits::VisitStatus;
use crate::services::location_service::{
    CheckInResult, Checkout, CollectibleDto, FavoriteDto, FavoriteToggle, LocationDetail,
    LocationError, LocationService, LocationSummary, MoodDto, VisitDto,
};
use crate::services::vibe_match;

pub struct SeaOrmLocationService {
    store: Store,
}

impl SeaOrmLocationService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn summaries(
        &self,
        locations: Vec<crate::db::Location>,
    ) -> Result<Vec<LocationSummary>, LocationError> {
        Ok(self
            .store
            .attach_moods(locations)
            .await?
            .into_iter()
            .map(LocationSummary::from)
            .collect())
    }

    async fn compute_vibe_match(&self, user_id: i32, location_id: i32) -> Result<i32, LocationError> {
        let location_moods = self.store.location_mood_ids(location_id).await?;
        let visited = self.store.visited_mood_ids(user_id).await?;
        Ok(vibe_match::score(&location_moods, &visited))
    }
}

#[async_trait]
impl LocationService for SeaOrmLocationService {
    async fn list_moods(&self) -> Result<Vec<MoodDto>, LocationError> {
        let moods = self.store.list_moods().await?;
        Ok(moods.into_iter().map(MoodDto::from).collect())
    }

    async fn get_mood(&self, id: i32) -> Result<MoodDto, LocationError> {
        self.store
            .get_mood(id)
            .await?
            .map(MoodDto::from)
            .ok_or(LocationError::NotFound("Mood"))
    }

    async fn list_locations(
        &self,
        mood_slug: Option<&str>,
    ) -> Result<Vec<LocationSummary>, LocationError> {
        let rows = self.store.list_approved_locations(mood_slug).await?;
        Ok(rows.into_iter().map(LocationSummary::from).collect())
    }

    async fn get_location(
        &self,
        id: i32,
        viewer: Option<i32>,
    ) -> Result<LocationDetail, LocationError> {
        let row = self
            .store
            .get_approved_location(id)
            .await?
            .ok_or(LocationError::NotFound("Location"))?;

        let vibe_match = match viewer {
            Some(user_id) => Some(self.compute_vibe_match(user_id, id).await?),
            None => None,
        };

        let location = row.location;
        Ok(LocationDetail {
            id: location.id,
            name: location.name,
            description: location.description,
            category: location.category,
            city: location.city,
            address: location.address,
            latitude: location.latitude,
            longitude: location.longitude,
            image_url: location.image_url,
            moods: row.moods.into_iter().map(MoodDto::from).collect(),
            vibe_match,
        })
    }

    async fn vibe_match(&self, user_id: i32, location_id: i32) -> Result<i32, LocationError> {
        if self.store.get_approved_location(location_id).await?.is_none() {
            return Err(LocationError::NotFound("Location"));
        }
        self.compute_vibe_match(user_id, location_id).await
    }

    async fn check_in(&self, user_id: i32, qr_code: &str) -> Result<CheckInResult, LocationError> {
        let location = self
            .store
            .find_approved_location_by_qr(qr_code)
            .await?
            .ok_or(LocationError::NotFound("Location"))?;

        let outcome = self.store.check_in(user_id, location.id).await?;

        let label = if outcome.collectible_awarded { "awarded" } else { "repeat" };
        metrics::counter!("checkins_total", "collectible" => label).increment(1);
        info!(
            user_id,
            location_id = location.id,
            visit_id = outcome.visit_id,
            collectible_awarded = outcome.collectible_awarded,
            "Check-in recorded"
        );

        Ok(CheckInResult {
            visit_id: outcome.visit_id,
            collectible_awarded: outcome.collectible_awarded,
        })
    }

    async fn check_out(
        &self,
        user_id: i32,
        visit_id: i32,
        checkout: Checkout,
    ) -> Result<i32, LocationError> {
        let visit = self
            .store
            .get_visit(visit_id)
            .await?
            .ok_or(LocationError::NotFound("Visit"))?;

        if visit.user_id != user_id {
            return Err(LocationError::Forbidden);
        }

        if visit.status != VisitStatus::Active {
            return Err(LocationError::Conflict("This visit is not active".to_string()));
        }

        if self.store.visit_has_review(visit.id).await? {
            return Err(LocationError::Conflict(
                "This visit is already reviewed".to_string(),
            ));
        }

        checkout.validate()?;

        let review_id = self
            .store
            .check_out(
                &visit,
                NewReview {
                    service_score: checkout.service_score,
                    quality_score: checkout.quality_score,
                    price_score: checkout.price_score,
                    vibe_score: checkout.vibe_score,
                    comment: checkout.comment,
                },
            )
            .await?
            .ok_or_else(|| LocationError::Conflict("This visit is not active".to_string()))?;

        info!(user_id, visit_id, review_id, "Visit checked out");
        Ok(review_id)
    }

    async fn my_visits(&self, user_id: i32) -> Result<Vec<VisitDto>, LocationError> {
        let rows = self.store.list_visits(user_id).await?;
        let (visits, locations): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        let summaries = self.summaries(locations).await?;

        Ok(visits
            .into_iter()
            .zip(summaries)
            .map(|(visit, location)| VisitDto {
                id: visit.id,
                location,
                status: visit.status,
                checked_in_at: visit.checked_in_at,
                checked_out_at: visit.checked_out_at,
            })
            .collect())
    }

    async fn my_collectibles(&self, user_id: i32) -> Result<Vec<CollectibleDto>, LocationError> {
        let rows = self.store.list_collectibles(user_id).await?;
        let (collectibles, locations): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        let summaries = self.summaries(locations).await?;

        Ok(collectibles
            .into_iter()
            .zip(summaries)
            .map(|(collectible, location)| CollectibleDto {
                id: collectible.id,
                location,
                awarded_at: collectible.awarded_at,
            })
            .collect())
    }

    async fn toggle_favorite(
        &self,
        user_id: i32,
        location_id: i32,
    ) -> Result<FavoriteToggle, LocationError> {
        if self.store.get_location(location_id).await?.is_none() {
            return Err(LocationError::NotFound("Location"));
        }

        if self.store.toggle_favorite(user_id, location_id).await? {
            Ok(FavoriteToggle::Added)
        } else {
            Ok(FavoriteToggle::Removed)
        }
    }

    async fn my_favorites(&self, user_id: i32) -> Result<Vec<FavoriteDto>, LocationError> {
        let rows = self.store.list_favorites(user_id).await?;
        let (favorites, locations): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        let summaries = self.summaries(locations).await?;

        Ok(favorites
            .into_iter()
            .zip(summaries)
            .map(|(favorite, location)| FavoriteDto {
                id: favorite.id,
                location,
                created_at: favorite.created_at,
            })
            .collect())
    }

    async fn remove_favorite(&self, user_id: i32, location_id: i32) -> Result<(), LocationError> {
        self.store.remove_favorite(user_id, location_id).await?;
        Ok(())
    }
}
