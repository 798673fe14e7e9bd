use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, sea_query::OnConflict,
};

use crate::entities::token_blacklist;

pub struct TokenBlacklistRepository {
    conn: DatabaseConnection,
}

impl TokenBlacklistRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn contains(&self, jti: &str) -> Result<bool> {
        let count = token_blacklist::Entity::find()
            .filter(token_blacklist::Column::Jti.eq(jti))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn add(&self, jti: &str, user_id: i32, expires_at: DateTime<Utc>) -> Result<()> {
        blacklist_in(&self.conn, jti, user_id, expires_at).await
    }

    /// Removes entries whose token expired before `cutoff`.
    pub async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = token_blacklist::Entity::delete_many()
            .filter(token_blacklist::Column::ExpiresAt.lt(cutoff))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}

/// Idempotent insert usable inside a transaction.
pub(crate) async fn blacklist_in<C: ConnectionTrait>(
    conn: &C,
    jti: &str,
    user_id: i32,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    let entry = token_blacklist::ActiveModel {
        jti: Set(jti.to_string()),
        user_id: Set(user_id),
        expires_at: Set(expires_at),
        blacklisted_at: Set(Utc::now()),
    };

    token_blacklist::Entity::insert(entry)
        .on_conflict(
            OnConflict::column(token_blacklist::Column::Jti)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}
