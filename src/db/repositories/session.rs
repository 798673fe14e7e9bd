use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};

use crate::entities::user_sessions;

use super::token_blacklist::blacklist_in;

pub use crate::entities::user_sessions::Model as UserSession;

/// Device metadata captured when a session is opened.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub device_name: String,
    pub user_agent: String,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i32,
    pub refresh_token_jti: String,
    pub expires_at: DateTime<Utc>,
    pub device: DeviceInfo,
}

pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, session: NewSession) -> Result<UserSession> {
        let now = Utc::now();
        let model = user_sessions::ActiveModel {
            user_id: Set(session.user_id),
            refresh_token_jti: Set(session.refresh_token_jti),
            device_name: Set(session.device.device_name),
            user_agent: Set(session.device.user_agent),
            ip_address: Set(session.device.ip_address),
            created_at: Set(now),
            last_seen_at: Set(now),
            expires_at: Set(session.expires_at),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert session")?;

        Ok(model)
    }

    pub async fn find_by_jti(&self, jti: &str) -> Result<Option<UserSession>> {
        let session = user_sessions::Entity::find()
            .filter(user_sessions::Column::RefreshTokenJti.eq(jti))
            .one(&self.conn)
            .await?;
        Ok(session)
    }

    /// Active sessions of a user, most recently used first.
    pub async fn list_active(&self, user_id: i32) -> Result<Vec<UserSession>> {
        let sessions = user_sessions::Entity::find()
            .filter(user_sessions::Column::UserId.eq(user_id))
            .filter(user_sessions::Column::IsActive.eq(true))
            .order_by_desc(user_sessions::Column::LastSeenAt)
            .all(&self.conn)
            .await?;
        Ok(sessions)
    }

    /// Replaces the session bound to `old_jti` with a new one carrying the
    /// same device metadata. The old jti is blacklisted.
    ///
    /// Returns `None` if the old session is no longer active, which also
    /// covers two refreshes racing on the same token.
    pub async fn rotate(
        &self,
        old_jti: &str,
        new_jti: String,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<UserSession>> {
        let now = Utc::now();
        let txn = self.conn.begin().await?;

        let Some(old) = user_sessions::Entity::find()
            .filter(user_sessions::Column::RefreshTokenJti.eq(old_jti))
            .filter(user_sessions::Column::IsActive.eq(true))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let closed = user_sessions::Entity::update_many()
            .col_expr(user_sessions::Column::IsActive, Expr::value(false))
            .filter(user_sessions::Column::Id.eq(old.id))
            .filter(user_sessions::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;

        if closed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        blacklist_in(&txn, old_jti, old.user_id, old.expires_at).await?;

        let replacement = user_sessions::ActiveModel {
            user_id: Set(old.user_id),
            refresh_token_jti: Set(new_jti),
            device_name: Set(old.device_name),
            user_agent: Set(old.user_agent),
            ip_address: Set(old.ip_address),
            created_at: Set(old.created_at),
            last_seen_at: Set(now),
            expires_at: Set(new_expires_at),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert rotated session")?;

        txn.commit().await?;
        Ok(Some(replacement))
    }

    /// Deactivates one session and blacklists its refresh jti.
    /// Returns `false` when no active session matched.
    pub async fn revoke_by_jti(&self, user_id: i32, jti: &str) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let Some(session) = user_sessions::Entity::find()
            .filter(user_sessions::Column::RefreshTokenJti.eq(jti))
            .filter(user_sessions::Column::UserId.eq(user_id))
            .filter(user_sessions::Column::IsActive.eq(true))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(false);
        };

        let revoked = revoke_one_in(&txn, &session).await?;
        txn.commit().await?;
        Ok(revoked)
    }

    /// Returns how many sessions were deactivated.
    pub async fn revoke_all(&self, user_id: i32) -> Result<u64> {
        let txn = self.conn.begin().await?;
        let count = revoke_sessions_in(&txn, user_id).await?;
        txn.commit().await?;
        Ok(count)
    }

    /// Drops sessions whose refresh token expired before `cutoff`.
    pub async fn purge_stale(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = user_sessions::Entity::delete_many()
            .filter(user_sessions::Column::ExpiresAt.lt(cutoff))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}

async fn revoke_one_in<C: ConnectionTrait>(conn: &C, session: &UserSession) -> Result<bool> {
    let closed = user_sessions::Entity::update_many()
        .col_expr(user_sessions::Column::IsActive, Expr::value(false))
        .filter(user_sessions::Column::Id.eq(session.id))
        .filter(user_sessions::Column::IsActive.eq(true))
        .exec(conn)
        .await?;

    if closed.rows_affected == 0 {
        return Ok(false);
    }

    blacklist_in(
        conn,
        &session.refresh_token_jti,
        session.user_id,
        session.expires_at,
    )
    .await?;

    Ok(true)
}

/// Deactivates all active sessions of a user and blacklists their refresh jtis.
pub(crate) async fn revoke_sessions_in<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<u64> {
    let sessions = user_sessions::Entity::find()
        .filter(user_sessions::Column::UserId.eq(user_id))
        .filter(user_sessions::Column::IsActive.eq(true))
        .all(conn)
        .await?;

    for session in &sessions {
        blacklist_in(conn, &session.refresh_token_jti, user_id, session.expires_at).await?;
    }

    let result = user_sessions::Entity::update_many()
        .col_expr(user_sessions::Column::IsActive, Expr::value(false))
        .filter(user_sessions::Column::UserId.eq(user_id))
        .filter(user_sessions::Column::IsActive.eq(true))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}
