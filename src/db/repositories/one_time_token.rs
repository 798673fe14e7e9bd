use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait, sea_query::Expr,
};

use crate::entities::{email_verification_tokens, password_reset_tokens, users};

use super::session::revoke_sessions_in;

/// Which flow a one-time token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

#[derive(Debug, Clone)]
pub struct OneTimeToken {
    pub id: i32,
    pub user_id: i32,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
}

impl OneTimeToken {
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && now < self.expires_at
    }
}

impl From<email_verification_tokens::Model> for OneTimeToken {
    fn from(model: email_verification_tokens::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            expires_at: model.expires_at,
            is_used: model.is_used,
        }
    }
}

impl From<password_reset_tokens::Model> for OneTimeToken {
    fn from(model: password_reset_tokens::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            expires_at: model.expires_at,
            is_used: model.is_used,
        }
    }
}

pub struct OneTimeTokenRepository {
    conn: DatabaseConnection,
}

impl OneTimeTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Stores a new token hash after marking every unused token of the same
    /// purpose for this user as used, so at most one stays redeemable.
    pub async fn issue(
        &self,
        purpose: TokenPurpose,
        user_id: i32,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        ip_address: Option<String>,
    ) -> Result<()> {
        let now = Utc::now();
        let txn = self.conn.begin().await?;

        match purpose {
            TokenPurpose::EmailVerification => {
                email_verification_tokens::Entity::update_many()
                    .col_expr(email_verification_tokens::Column::IsUsed, Expr::value(true))
                    .filter(email_verification_tokens::Column::UserId.eq(user_id))
                    .filter(email_verification_tokens::Column::IsUsed.eq(false))
                    .exec(&txn)
                    .await?;

                email_verification_tokens::ActiveModel {
                    user_id: Set(user_id),
                    token_hash: Set(token_hash.to_string()),
                    created_at: Set(now),
                    expires_at: Set(expires_at),
                    is_used: Set(false),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .context("Failed to insert verification token")?;
            }
            TokenPurpose::PasswordReset => {
                password_reset_tokens::Entity::update_many()
                    .col_expr(password_reset_tokens::Column::IsUsed, Expr::value(true))
                    .filter(password_reset_tokens::Column::UserId.eq(user_id))
                    .filter(password_reset_tokens::Column::IsUsed.eq(false))
                    .exec(&txn)
                    .await?;

                password_reset_tokens::ActiveModel {
                    user_id: Set(user_id),
                    token_hash: Set(token_hash.to_string()),
                    created_at: Set(now),
                    expires_at: Set(expires_at),
                    is_used: Set(false),
                    ip_address: Set(ip_address),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .context("Failed to insert password reset token")?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    pub async fn find_by_hash(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
    ) -> Result<Option<OneTimeToken>> {
        let token = match purpose {
            TokenPurpose::EmailVerification => email_verification_tokens::Entity::find()
                .filter(email_verification_tokens::Column::TokenHash.eq(token_hash))
                .one(&self.conn)
                .await?
                .map(OneTimeToken::from),
            TokenPurpose::PasswordReset => password_reset_tokens::Entity::find()
                .filter(password_reset_tokens::Column::TokenHash.eq(token_hash))
                .one(&self.conn)
                .await?
                .map(OneTimeToken::from),
        };

        Ok(token)
    }

    /// Marks the token used and activates its owner.
    /// Returns `false` when the token was already consumed concurrently.
    pub async fn redeem_verification(&self, token: &OneTimeToken) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let claimed = email_verification_tokens::Entity::update_many()
            .col_expr(email_verification_tokens::Column::IsUsed, Expr::value(true))
            .filter(email_verification_tokens::Column::Id.eq(token.id))
            .filter(email_verification_tokens::Column::IsUsed.eq(false))
            .exec(&txn)
            .await?;

        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        users::Entity::update_many()
            .col_expr(users::Column::IsActive, Expr::value(true))
            .filter(users::Column::Id.eq(token.user_id))
            .exec(&txn)
            .await
            .context("Failed to activate user")?;

        txn.commit().await?;
        Ok(true)
    }

    /// Marks the token used, replaces the password hash and revokes every
    /// active session of the user in one transaction.
    /// Returns `false` when the token was already consumed concurrently.
    pub async fn redeem_password_reset(
        &self,
        token: &OneTimeToken,
        new_password_hash: String,
    ) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let claimed = password_reset_tokens::Entity::update_many()
            .col_expr(password_reset_tokens::Column::IsUsed, Expr::value(true))
            .filter(password_reset_tokens::Column::Id.eq(token.id))
            .filter(password_reset_tokens::Column::IsUsed.eq(false))
            .exec(&txn)
            .await?;

        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(new_password_hash))
            .filter(users::Column::Id.eq(token.user_id))
            .exec(&txn)
            .await
            .context("Failed to update password")?;

        revoke_sessions_in(&txn, token.user_id).await?;

        txn.commit().await?;
        Ok(true)
    }

    /// Deletes tokens that expired before `cutoff`.
    pub async fn purge(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let verification = email_verification_tokens::Entity::delete_many()
            .filter(email_verification_tokens::Column::ExpiresAt.lt(cutoff))
            .exec(&self.conn)
            .await?;

        let reset = password_reset_tokens::Entity::delete_many()
            .filter(password_reset_tokens::Column::ExpiresAt.lt(cutoff))
            .exec(&self.conn)
            .await?;

        Ok(verification.rows_affected + reset.rows_affected)
    }
}
