use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{favorites, locations};

pub use crate::entities::favorites::Model as Favorite;

pub struct FavoriteRepository {
    conn: DatabaseConnection,
}

impl FavoriteRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn find(&self, user_id: i32, location_id: i32) -> Result<Option<Favorite>> {
        let favorite = favorites::Entity::find()
            .filter(favorites::Column::UserId.eq(user_id))
            .filter(favorites::Column::LocationId.eq(location_id))
            .one(&self.conn)
            .await?;
        Ok(favorite)
    }

    /// Removes the favorite if present, otherwise creates it.
    /// Returns `true` when a favorite was created.
    pub async fn toggle(&self, user_id: i32, location_id: i32) -> Result<bool> {
        if let Some(existing) = self.find(user_id, location_id).await? {
            existing.delete(&self.conn).await?;
            return Ok(false);
        }

        favorites::ActiveModel {
            user_id: Set(user_id),
            location_id: Set(location_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert favorite")?;

        Ok(true)
    }

    /// Returns `true` when a row was deleted.
    pub async fn remove(&self, user_id: i32, location_id: i32) -> Result<bool> {
        let result = favorites::Entity::delete_many()
            .filter(favorites::Column::UserId.eq(user_id))
            .filter(favorites::Column::LocationId.eq(location_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<(Favorite, locations::Model)>> {
        let rows = favorites::Entity::find()
            .filter(favorites::Column::UserId.eq(user_id))
            .order_by_desc(favorites::Column::CreatedAt)
            .order_by_desc(favorites::Column::Id)
            .find_also_related(locations::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list favorites")?;

        Ok(rows
            .into_iter()
            .filter_map(|(favorite, location)| location.map(|l| (favorite, l)))
            .collect())
    }
}
