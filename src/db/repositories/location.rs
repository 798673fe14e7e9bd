use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait, sea_query::OnConflict,
};

use crate::entities::locations::{LocationCategory, LocationStatus};
use crate::entities::visits::VisitStatus;
use crate::entities::{location_moods, locations, moods, visits};

pub use crate::entities::locations::Model as Location;
pub use crate::entities::moods::Model as Mood;

/// A location row together with its moods.
#[derive(Debug, Clone)]
pub struct LocationWithMoods {
    pub location: Location,
    pub moods: Vec<Mood>,
}

/// Fields accepted when creating a venue (seed and admin tooling).
#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub description: String,
    pub category: LocationCategory,
    pub status: LocationStatus,
    pub city: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub qr_code: String,
    pub image_url: String,
    pub vibe_match_score: i32,
    pub mood_slugs: Vec<String>,
}

pub struct LocationRepository {
    conn: DatabaseConnection,
}

impl LocationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_active_moods(&self) -> Result<Vec<Mood>> {
        let rows = moods::Entity::find()
            .filter(moods::Column::IsActive.eq(true))
            .order_by_asc(moods::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list moods")?;
        Ok(rows)
    }

    pub async fn get_active_mood(&self, id: i32) -> Result<Option<Mood>> {
        let mood = moods::Entity::find_by_id(id)
            .filter(moods::Column::IsActive.eq(true))
            .one(&self.conn)
            .await?;
        Ok(mood)
    }

    /// Approved locations, newest first. With `mood_slug` only locations
    /// tagged with that mood are returned.
    pub async fn list_approved(&self, mood_slug: Option<&str>) -> Result<Vec<LocationWithMoods>> {
        let mut query = locations::Entity::find()
            .filter(locations::Column::Status.eq(LocationStatus::Approved))
            .order_by_desc(locations::Column::CreatedAt)
            .order_by_desc(locations::Column::Id);

        if let Some(slug) = mood_slug {
            let Some(mood) = moods::Entity::find()
                .filter(moods::Column::Slug.eq(slug))
                .one(&self.conn)
                .await?
            else {
                return Ok(Vec::new());
            };

            let ids: Vec<i32> = location_moods::Entity::find()
                .filter(location_moods::Column::MoodId.eq(mood.id))
                .all(&self.conn)
                .await?
                .into_iter()
                .map(|row| row.location_id)
                .collect();

            query = query.filter(locations::Column::Id.is_in(ids));
        }

        let rows = query
            .all(&self.conn)
            .await
            .context("Failed to list locations")?;

        self.attach_moods(rows).await
    }

    pub async fn get(&self, id: i32) -> Result<Option<Location>> {
        let location = locations::Entity::find_by_id(id).one(&self.conn).await?;
        Ok(location)
    }

    pub async fn get_approved(&self, id: i32) -> Result<Option<LocationWithMoods>> {
        let Some(location) = locations::Entity::find_by_id(id)
            .filter(locations::Column::Status.eq(LocationStatus::Approved))
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        Ok(self.attach_moods(vec![location]).await?.pop())
    }

    pub async fn find_approved_by_qr(&self, qr_code: &str) -> Result<Option<Location>> {
        let location = locations::Entity::find()
            .filter(locations::Column::QrCode.eq(qr_code))
            .filter(locations::Column::Status.eq(LocationStatus::Approved))
            .one(&self.conn)
            .await?;
        Ok(location)
    }

    pub async fn mood_ids_for_location(&self, location_id: i32) -> Result<HashSet<i32>> {
        let ids = location_moods::Entity::find()
            .filter(location_moods::Column::LocationId.eq(location_id))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|row| row.mood_id)
            .collect();
        Ok(ids)
    }

    /// Moods of every location where the user has a completed visit.
    pub async fn visited_mood_ids(&self, user_id: i32) -> Result<HashSet<i32>> {
        let location_ids: Vec<i32> = visits::Entity::find()
            .select_only()
            .column(visits::Column::LocationId)
            .filter(visits::Column::UserId.eq(user_id))
            .filter(visits::Column::Status.eq(VisitStatus::Completed))
            .distinct()
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to query visited locations")?;

        if location_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids = location_moods::Entity::find()
            .filter(location_moods::Column::LocationId.is_in(location_ids))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|row| row.mood_id)
            .collect();
        Ok(ids)
    }

    /// Loads the moods of each location and keeps the input order.
    pub async fn attach_moods(&self, rows: Vec<Location>) -> Result<Vec<LocationWithMoods>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: HashSet<i32> = rows.iter().map(|l| l.id).collect();
        let links = location_moods::Entity::find()
            .filter(location_moods::Column::LocationId.is_in(ids))
            .find_also_related(moods::Entity)
            .all(&self.conn)
            .await
            .context("Failed to load location moods")?;

        let mut by_location: HashMap<i32, Vec<Mood>> = HashMap::new();
        for (link, mood) in links {
            if let Some(mood) = mood {
                by_location.entry(link.location_id).or_default().push(mood);
            }
        }

        Ok(rows
            .into_iter()
            .map(|location| {
                let mut moods = by_location.get(&location.id).cloned().unwrap_or_default();
                moods.sort_by(|a, b| a.name.cmp(&b.name));
                LocationWithMoods { location, moods }
            })
            .collect())
    }

    /// Inserts or renames a mood keyed by slug.
    pub async fn upsert_mood(&self, name: &str, slug: &str) -> Result<Mood> {
        moods::Entity::insert(moods::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            is_active: Set(true),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(moods::Column::Slug)
                .update_column(moods::Column::Name)
                .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to upsert mood")?;

        moods::Entity::find()
            .filter(moods::Column::Slug.eq(slug))
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Mood {slug} missing after upsert"))
    }

    /// Creates a location unless one with the same QR code exists.
    /// Returns `None` when it was skipped.
    pub async fn create_if_missing(&self, new: NewLocation) -> Result<Option<Location>> {
        let exists = locations::Entity::find()
            .filter(locations::Column::QrCode.eq(new.qr_code.as_str()))
            .one(&self.conn)
            .await?
            .is_some();
        if exists {
            return Ok(None);
        }

        let now = Utc::now();
        let txn = self.conn.begin().await?;

        let location = locations::ActiveModel {
            name: Set(new.name),
            description: Set(new.description),
            category: Set(new.category),
            status: Set(new.status),
            city: Set(new.city),
            address: Set(new.address),
            latitude: Set(new.latitude),
            longitude: Set(new.longitude),
            qr_code: Set(new.qr_code),
            image_url: Set(new.image_url),
            vibe_match_score: Set(new.vibe_match_score),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert location")?;

        if !new.mood_slugs.is_empty() {
            let tagged = moods::Entity::find()
                .filter(moods::Column::Slug.is_in(new.mood_slugs))
                .all(&txn)
                .await?;

            for mood in tagged {
                location_moods::Entity::insert(location_moods::ActiveModel {
                    location_id: Set(location.id),
                    mood_id: Set(mood.id),
                })
                .exec_without_returning(&txn)
                .await?;
            }
        }

        txn.commit().await?;
        Ok(Some(location))
    }
}
