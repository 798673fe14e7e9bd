//! Domain service for accounts: registration, email verification, login,
//! token rotation, sessions and password reset.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::{DeviceInfo, User, UserSession};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, expired or revoked credentials on a request.
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("Token is invalid or expired")]
    InvalidToken,

    #[error("Email address has not been verified")]
    EmailNotVerified { email: String },

    #[error("Too many failed login attempts, try again later")]
    Locked { locked_until: DateTime<Utc> },

    #[error("Invalid token")]
    UnknownOneTimeToken,

    #[error("Token expired or already used")]
    OneTimeTokenUnusable,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_email_verified: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_email_verified: user.is_active,
            date_joined: user.date_joined,
            last_login: user.last_login,
        }
    }
}

/// Already validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResult {
    pub user: UserProfile,
    pub email_sent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub access: String,
    pub refresh: String,
    pub user: UserProfile,
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub username: String,
    /// Refresh-token jti of the session the access token was minted for.
    pub session_jti: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: i32,
    pub jti: String,
    pub device_name: String,
    pub user_agent: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub is_active: bool,
    pub is_current: bool,
}

impl SessionInfo {
    #[must_use]
    pub fn from_session(session: UserSession, current_jti: Option<&str>) -> Self {
        let is_current = current_jti == Some(session.refresh_token_jti.as_str());
        Self {
            id: session.id,
            jti: session.refresh_token_jti,
            device_name: session.device_name,
            user_agent: session.user_agent,
            ip_address: session.ip_address,
            created_at: session.created_at,
            last_seen_at: session.last_seen_at,
            is_active: session.is_active,
            is_current,
        }
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an inactive account and mails its verification link.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the username or email is taken.
    async fn register(&self, registration: Registration) -> Result<RegisterResult, AuthError>;

    /// Redeems a verification token and activates the account.
    async fn verify_email(&self, raw_token: &str) -> Result<UserProfile, AuthError>;

    /// Issues a fresh verification token for an inactive account.
    /// Succeeds silently when no such account exists.
    async fn resend_verification(&self, email: &str) -> Result<(), AuthError>;

    /// Verifies credentials under the login throttle and opens a session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Locked`] while the identifier is locked out
    /// - [`AuthError::EmailNotVerified`] for an unverified account
    /// - [`AuthError::InvalidCredentials`] otherwise on failure
    async fn login(
        &self,
        username: &str,
        password: &str,
        device: DeviceInfo,
    ) -> Result<LoginResult, AuthError>;

    /// Rotates a refresh token: the old one is revoked, a new pair is issued.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// Revokes the session bound to `refresh_token` if it belongs to `user_id`.
    async fn logout(&self, user_id: i32, refresh_token: &str) -> Result<(), AuthError>;

    /// Revokes every active session of the user. Returns how many were closed.
    async fn logout_all(&self, user_id: i32) -> Result<u64, AuthError>;

    /// Resolves a bearer access token to its user.
    async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, AuthError>;

    async fn get_profile(&self, user_id: i32) -> Result<UserProfile, AuthError>;

    async fn update_profile(
        &self,
        user_id: i32,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<UserProfile, AuthError>;

    /// Mails a reset link to an active account. Succeeds silently otherwise.
    async fn request_password_reset(
        &self,
        email: &str,
        ip_address: Option<String>,
    ) -> Result<(), AuthError>;

    /// Redeems a reset token, sets the new password and revokes all sessions.
    async fn confirm_password_reset(
        &self,
        raw_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    async fn list_sessions(
        &self,
        user_id: i32,
        current_jti: Option<&str>,
    ) -> Result<Vec<SessionInfo>, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::SessionNotFound`] unless `jti` is an active session of the user.
    async fn revoke_session(&self, user_id: i32, jti: &str) -> Result<(), AuthError>;
}
