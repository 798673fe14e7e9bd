use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::{Expr, OnConflict},
};

use crate::entities::login_attempts;

pub use crate::entities::login_attempts::Model as LoginAttempt;

pub struct LoginAttemptRepository {
    conn: DatabaseConnection,
}

impl LoginAttemptRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, identifier: &str) -> Result<Option<LoginAttempt>> {
        let record = login_attempts::Entity::find()
            .filter(login_attempts::Column::Identifier.eq(identifier))
            .one(&self.conn)
            .await
            .context("Failed to query login attempts")?;
        Ok(record)
    }

    /// Increments the failure counter in one upsert, creating the row on first failure.
    pub async fn record_failure(&self, identifier: &str, now: DateTime<Utc>) -> Result<i32> {
        login_attempts::Entity::insert(login_attempts::ActiveModel {
            identifier: Set(identifier.to_string()),
            attempts: Set(1),
            locked_until: Set(None),
            last_attempt: Set(now),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(login_attempts::Column::Identifier)
                .value(
                    login_attempts::Column::Attempts,
                    Expr::col(login_attempts::Column::Attempts).add(1),
                )
                .update_column(login_attempts::Column::LastAttempt)
                .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to record login failure")?;

        let attempts = self.get(identifier).await?.map_or(1, |record| record.attempts);
        Ok(attempts)
    }

    /// Sets the lock unless one is already in place.
    pub async fn lock_until(
        &self,
        identifier: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        login_attempts::Entity::update_many()
            .col_expr(login_attempts::Column::LockedUntil, Expr::value(Some(until)))
            .col_expr(login_attempts::Column::LastAttempt, Expr::value(now))
            .filter(login_attempts::Column::Identifier.eq(identifier))
            .filter(
                Condition::any()
                    .add(login_attempts::Column::LockedUntil.is_null())
                    .add(login_attempts::Column::LockedUntil.lt(now)),
            )
            .exec(&self.conn)
            .await
            .context("Failed to lock login")?;
        Ok(())
    }

    /// Zeroes the counter and clears any lock.
    pub async fn reset(&self, identifier: &str) -> Result<()> {
        login_attempts::Entity::update_many()
            .col_expr(login_attempts::Column::Attempts, Expr::value(0))
            .col_expr(
                login_attempts::Column::LockedUntil,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .filter(login_attempts::Column::Identifier.eq(identifier))
            .exec(&self.conn)
            .await
            .context("Failed to reset login attempts")?;
        Ok(())
    }

    /// Deletes counters idle since `cutoff` that are not currently locked.
    pub async fn purge_stale(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64> {
        let result = login_attempts::Entity::delete_many()
            .filter(login_attempts::Column::LastAttempt.lt(cutoff))
            .filter(
                Condition::any()
                    .add(login_attempts::Column::LockedUntil.is_null())
                    .add(login_attempts::Column::LockedUntil.lt(now)),
            )
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
