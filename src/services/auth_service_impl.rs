//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::db::repositories::user::hash_password_blocking;
use crate::db::{DeviceInfo, NewSession, NewUser, Store, TokenPurpose};
use crate::services::auth_service::{
    AuthError, AuthService, AuthenticatedUser, LoginResult, RegisterResult, Registration,
    SessionInfo, TokenPair, UserProfile,
};
use crate::services::mailer::{self, Mailer};
use crate::services::one_time_token;
use crate::services::rate_limiter::{LoginRateLimiter, RateDecision};
use crate::services::token_issuer::{TokenError, TokenIssuer, TokenType};

pub struct SeaOrmAuthService {
    store: Store,
    config: Arc<Config>,
    issuer: Arc<TokenIssuer>,
    mailer: Arc<dyn Mailer>,
    limiter: LoginRateLimiter,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        config: Arc<Config>,
        issuer: Arc<TokenIssuer>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let limiter = LoginRateLimiter::new(store.clone(), config.security.login_throttle.clone());
        Self {
            store,
            config,
            issuer,
            mailer,
            limiter,
        }
    }

    /// Mail failures are logged, never surfaced to the caller.
    async fn deliver(&self, email: mailer::OutgoingEmail) -> bool {
        let to = email.to.clone();
        match self.mailer.send(email).await {
            Ok(()) => true,
            Err(e) => {
                warn!(to = %to, error = %e, "Failed to send email");
                false
            }
        }
    }

    async fn send_verification(&self, email: &str, username: &str, raw_token: &str) -> bool {
        let link = match mailer::action_link(&self.config.auth.frontend_url, "verify-email", raw_token) {
            Ok(link) => link,
            Err(e) => {
                warn!(error = %e, "Cannot build verification link");
                return false;
            }
        };
        self.deliver(mailer::verification_email(email, username, link))
            .await
    }

    async fn ensure_identity_free(&self, username: &str, email: &str) -> Result<(), AuthError> {
        if self.store.username_taken(username).await? {
            return Err(AuthError::Validation(
                "A user with that username already exists".to_string(),
            ));
        }
        if self.store.email_taken(email).await? {
            return Err(AuthError::Validation(
                "This email is already registered".to_string(),
            ));
        }
        Ok(())
    }

    fn verification_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::hours(self.config.auth.email_verification_hours)
    }

    fn decode_refresh(&self, token: &str) -> Result<crate::services::token_issuer::Claims, TokenError> {
        self.issuer.decode(token, TokenType::Refresh)
    }
}

fn map_token_error(err: TokenError) -> AuthError {
    match err {
        TokenError::Signing(msg) => AuthError::Internal(msg),
        TokenError::Expired | TokenError::Invalid | TokenError::WrongType => AuthError::InvalidToken,
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, registration: Registration) -> Result<RegisterResult, AuthError> {
        self.ensure_identity_free(&registration.username, &registration.email)
            .await?;

        let password_hash =
            hash_password_blocking(&registration.password, &self.config.security).await?;
        let token = one_time_token::generate();

        let created = self
            .store
            .create_user_with_verification(
                NewUser {
                    username: registration.username.clone(),
                    email: registration.email.clone(),
                    first_name: registration.first_name,
                    last_name: registration.last_name,
                    password_hash,
                },
                &token.hash,
                self.verification_expiry(),
            )
            .await?;

        let Some(user) = created else {
            // Lost a race against a concurrent registration.
            self.ensure_identity_free(&registration.username, &registration.email)
                .await?;
            return Err(AuthError::Validation(
                "A user with that username or email already exists".to_string(),
            ));
        };

        let email_sent = self
            .send_verification(&user.email, &user.username, &token.raw)
            .await;

        info!(user_id = user.id, email_sent, "User registered");

        Ok(RegisterResult {
            user: UserProfile::from(user),
            email_sent,
        })
    }

    async fn verify_email(&self, raw_token: &str) -> Result<UserProfile, AuthError> {
        if !one_time_token::is_well_formed(raw_token) {
            return Err(AuthError::UnknownOneTimeToken);
        }

        let hash = one_time_token::hash_token(raw_token);
        let token = self
            .store
            .find_one_time_token(TokenPurpose::EmailVerification, &hash)
            .await?
            .ok_or(AuthError::UnknownOneTimeToken)?;

        if !token.is_redeemable(Utc::now()) {
            return Err(AuthError::OneTimeTokenUnusable);
        }

        if !self.store.redeem_verification_token(&token).await? {
            return Err(AuthError::OneTimeTokenUnusable);
        }

        let user = self
            .store
            .get_user(token.user_id)
            .await?
            .ok_or_else(|| AuthError::Internal("Verified user disappeared".to_string()))?;

        info!(user_id = user.id, "Email verified");
        Ok(UserProfile::from(user))
    }

    async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.store.get_user_by_email(email).await? else {
            warn!("Verification resend requested for unknown email");
            return Ok(());
        };

        if user.is_active {
            info!(user_id = user.id, "Verification resend requested for verified user");
            return Ok(());
        }

        let token = one_time_token::generate();
        self.store
            .issue_one_time_token(
                TokenPurpose::EmailVerification,
                user.id,
                &token.hash,
                self.verification_expiry(),
                None,
            )
            .await?;

        self.send_verification(&user.email, &user.username, &token.raw)
            .await;
        info!(user_id = user.id, "Verification email resent");
        Ok(())
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
        device: DeviceInfo,
    ) -> Result<LoginResult, AuthError> {
        let identifier = username.to_lowercase();

        if let RateDecision::Locked { locked_until } = self.limiter.check(&identifier).await? {
            metrics::counter!("auth_login_total", "outcome" => "locked").increment(1);
            return Err(AuthError::Locked { locked_until });
        }

        if let Some(existing) = self.store.get_user_by_username(username).await?
            && !existing.is_active
        {
            metrics::counter!("auth_login_total", "outcome" => "unverified").increment(1);
            return Err(AuthError::EmailNotVerified {
                email: existing.email,
            });
        }

        let Some(user) = self.store.verify_user_password(username, password).await? else {
            self.limiter.record_failure(&identifier).await?;
            metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
            return Err(AuthError::InvalidCredentials);
        };

        self.limiter.reset(&identifier).await?;

        let pair = self.issuer.issue_pair(user.id).map_err(map_token_error)?;
        let ip = device.ip_address.clone();
        self.store
            .create_session(NewSession {
                user_id: user.id,
                refresh_token_jti: pair.refresh_jti.clone(),
                expires_at: pair.refresh_expires_at,
                device,
            })
            .await?;
        self.store.record_user_login(user.id).await?;

        let user = self.store.get_user(user.id).await?.unwrap_or(user);

        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
        info!(user_id = user.id, ip = ?ip, "User logged in");

        Ok(LoginResult {
            access: pair.access,
            refresh: pair.refresh,
            user: UserProfile::from(user),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.decode_refresh(refresh_token).map_err(map_token_error)?;

        if self.store.is_token_blacklisted(&claims.jti).await? {
            warn!(jti = %claims.jti, "Blacklisted refresh token presented");
            return Err(AuthError::InvalidToken);
        }

        let user_id = claims.user_id().map_err(map_token_error)?;
        let user = self
            .store
            .get_user(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidToken)?;

        let pair = self.issuer.issue_pair(user.id).map_err(map_token_error)?;

        let rotated = self
            .store
            .rotate_session(&claims.jti, pair.refresh_jti.clone(), pair.refresh_expires_at)
            .await?;

        if rotated.is_none() {
            return Err(AuthError::InvalidToken);
        }

        Ok(TokenPair {
            access: pair.access,
            refresh: pair.refresh,
        })
    }

    async fn logout(&self, user_id: i32, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self
            .decode_refresh(refresh_token)
            .map_err(|_| AuthError::Validation("Token is invalid or expired".to_string()))?;

        if claims.user_id().ok() != Some(user_id) {
            return Err(AuthError::Validation(
                "Token is invalid or expired".to_string(),
            ));
        }

        let revoked = self
            .store
            .revoke_session_by_jti(user_id, &claims.jti)
            .await?;
        if !revoked {
            // No live session (e.g. already revoked); still make sure the token is dead.
            self.store
                .blacklist_token(&claims.jti, user_id, claims.expires_at())
                .await?;
        }

        info!(user_id, "User logged out");
        Ok(())
    }

    async fn logout_all(&self, user_id: i32) -> Result<u64, AuthError> {
        let count = self.store.revoke_all_sessions(user_id).await?;
        info!(user_id, sessions = count, "All sessions logged out");
        Ok(count)
    }

    async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self
            .issuer
            .decode(access_token, TokenType::Access)
            .map_err(|_| AuthError::Unauthorized)?;

        let user_id = claims.user_id().map_err(|_| AuthError::Unauthorized)?;

        // Every access token is bound to a live refresh session.
        let Some(sid) = claims.sid else {
            return Err(AuthError::Unauthorized);
        };
        let session_live = self
            .store
            .get_session_by_jti(&sid)
            .await?
            .is_some_and(|s| s.is_active && s.user_id == user_id);
        if !session_live {
            return Err(AuthError::Unauthorized);
        }

        let user = self
            .store
            .get_user(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::Unauthorized)?;

        Ok(AuthenticatedUser {
            id: user.id,
            username: user.username,
            session_jti: sid,
        })
    }

    async fn get_profile(&self, user_id: i32) -> Result<UserProfile, AuthError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        Ok(UserProfile::from(user))
    }

    async fn update_profile(
        &self,
        user_id: i32,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<UserProfile, AuthError> {
        let user = self
            .store
            .update_user_names(user_id, first_name, last_name)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        Ok(UserProfile::from(user))
    }

    async fn request_password_reset(
        &self,
        email: &str,
        ip_address: Option<String>,
    ) -> Result<(), AuthError> {
        let Some(user) = self
            .store
            .get_user_by_email(email)
            .await?
            .filter(|u| u.is_active)
        else {
            warn!("Password reset requested for unknown or inactive email");
            return Ok(());
        };

        let token = one_time_token::generate();
        let expires_at = Utc::now() + Duration::minutes(self.config.auth.password_reset_minutes);
        self.store
            .issue_one_time_token(
                TokenPurpose::PasswordReset,
                user.id,
                &token.hash,
                expires_at,
                ip_address,
            )
            .await?;

        match mailer::action_link(
            &self.config.auth.frontend_url,
            "password-reset/confirm",
            &token.raw,
        ) {
            Ok(link) => {
                self.deliver(mailer::password_reset_email(&user.email, &user.username, link))
                    .await;
            }
            Err(e) => warn!(error = %e, "Cannot build password reset link"),
        }

        info!(user_id = user.id, "Password reset requested");
        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        raw_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if !one_time_token::is_well_formed(raw_token) {
            return Err(AuthError::UnknownOneTimeToken);
        }

        let hash = one_time_token::hash_token(raw_token);
        let token = self
            .store
            .find_one_time_token(TokenPurpose::PasswordReset, &hash)
            .await?
            .ok_or(AuthError::UnknownOneTimeToken)?;

        if !token.is_redeemable(Utc::now()) {
            return Err(AuthError::OneTimeTokenUnusable);
        }

        let password_hash = hash_password_blocking(new_password, &self.config.security).await?;

        if !self
            .store
            .redeem_password_reset_token(&token, password_hash)
            .await?
        {
            return Err(AuthError::OneTimeTokenUnusable);
        }

        info!(user_id = token.user_id, "Password reset completed");
        Ok(())
    }

    async fn list_sessions(
        &self,
        user_id: i32,
        current_jti: Option<&str>,
    ) -> Result<Vec<SessionInfo>, AuthError> {
        let sessions = self.store.list_active_sessions(user_id).await?;
        Ok(sessions
            .into_iter()
            .map(|s| SessionInfo::from_session(s, current_jti))
            .collect())
    }

    async fn revoke_session(&self, user_id: i32, jti: &str) -> Result<(), AuthError> {
        if !self.store.revoke_session_by_jti(user_id, jti).await? {
            return Err(AuthError::SessionNotFound);
        }
        info!(user_id, "Session revoked");
        Ok(())
    }
}
