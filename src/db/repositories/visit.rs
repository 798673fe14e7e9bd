use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr, sea_query::OnConflict,
};

use crate::entities::visits::VisitStatus;
use crate::entities::{collectibles, locations, reviews, visits};

pub use crate::entities::collectibles::Model as Collectible;
pub use crate::entities::visits::Model as Visit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckIn {
    pub visit_id: i32,
    pub collectible_awarded: bool,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub service_score: i16,
    pub quality_score: i16,
    pub price_score: i16,
    pub vibe_score: i16,
    pub comment: String,
}

pub struct VisitRepository {
    conn: DatabaseConnection,
}

impl VisitRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Records an active visit and awards the location's collectible the first
    /// time. Both writes commit together or not at all.
    pub async fn check_in(&self, user_id: i32, location_id: i32) -> Result<CheckIn> {
        let now = Utc::now();
        let txn = self.conn.begin().await?;

        let visit = visits::ActiveModel {
            user_id: Set(user_id),
            location_id: Set(location_id),
            status: Set(VisitStatus::Active),
            checked_in_at: Set(now),
            checked_out_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert visit")?;

        // The unique (user_id, location_id) index turns a second award into a no-op.
        let inserted = collectibles::Entity::insert(collectibles::ActiveModel {
            user_id: Set(user_id),
            location_id: Set(location_id),
            awarded_at: Set(now),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                collectibles::Column::UserId,
                collectibles::Column::LocationId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .context("Failed to insert collectible")?;

        txn.commit().await?;

        Ok(CheckIn {
            visit_id: visit.id,
            collectible_awarded: inserted > 0,
        })
    }

    pub async fn get(&self, id: i32) -> Result<Option<Visit>> {
        let visit = visits::Entity::find_by_id(id).one(&self.conn).await?;
        Ok(visit)
    }

    pub async fn has_review(&self, visit_id: i32) -> Result<bool> {
        let count = reviews::Entity::find()
            .filter(reviews::Column::VisitId.eq(visit_id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    /// Stores the review and completes the visit.
    /// Returns `None` if the visit stopped being active in the meantime.
    pub async fn check_out(&self, visit: &Visit, review: NewReview) -> Result<Option<i32>> {
        let now = Utc::now();
        let txn = self.conn.begin().await?;

        let completed = visits::Entity::update_many()
            .col_expr(visits::Column::Status, Expr::value(VisitStatus::Completed))
            .col_expr(visits::Column::CheckedOutAt, Expr::value(now))
            .filter(visits::Column::Id.eq(visit.id))
            .filter(visits::Column::Status.eq(VisitStatus::Active))
            .exec(&txn)
            .await?;

        if completed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let saved = reviews::ActiveModel {
            user_id: Set(visit.user_id),
            location_id: Set(visit.location_id),
            visit_id: Set(visit.id),
            service_score: Set(review.service_score),
            quality_score: Set(review.quality_score),
            price_score: Set(review.price_score),
            vibe_score: Set(review.vibe_score),
            comment: Set(review.comment),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert review")?;

        txn.commit().await?;
        Ok(Some(saved.id))
    }

    /// The user's visits, newest first, with their location.
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<(Visit, locations::Model)>> {
        let rows = visits::Entity::find()
            .filter(visits::Column::UserId.eq(user_id))
            .order_by_desc(visits::Column::CheckedInAt)
            .order_by_desc(visits::Column::Id)
            .find_also_related(locations::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list visits")?;

        Ok(rows
            .into_iter()
            .filter_map(|(visit, location)| location.map(|l| (visit, l)))
            .collect())
    }

    pub async fn list_collectibles(
        &self,
        user_id: i32,
    ) -> Result<Vec<(Collectible, locations::Model)>> {
        let rows = collectibles::Entity::find()
            .filter(collectibles::Column::UserId.eq(user_id))
            .order_by_desc(collectibles::Column::AwardedAt)
            .order_by_desc(collectibles::Column::Id)
            .find_also_related(locations::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list collectibles")?;

        Ok(rows
            .into_iter()
            .filter_map(|(collectible, location)| location.map(|l| (collectible, l)))
            .collect())
    }

    pub async fn count_collectibles(&self, user_id: i32, location_id: i32) -> Result<u64> {
        let count = collectibles::Entity::find()
            .filter(collectibles::Column::UserId.eq(user_id))
            .filter(collectibles::Column::LocationId.eq(location_id))
            .count(&self.conn)
            .await?;
        Ok(count)
    }
}
