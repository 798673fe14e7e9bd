use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::location::{Location, LocationWithMoods, Mood, NewLocation};
pub use repositories::login_attempt::LoginAttempt;
pub use repositories::one_time_token::{OneTimeToken, TokenPurpose};
pub use repositories::session::{DeviceInfo, NewSession, UserSession};
pub use repositories::user::{NewUser, User};
pub use repositories::visit::{CheckIn, Collectible, NewReview, Visit};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::one_time_token::OneTimeTokenRepository {
        repositories::one_time_token::OneTimeTokenRepository::new(self.conn.clone())
    }

    fn session_repo(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    fn blacklist_repo(&self) -> repositories::token_blacklist::TokenBlacklistRepository {
        repositories::token_blacklist::TokenBlacklistRepository::new(self.conn.clone())
    }

    fn login_attempt_repo(&self) -> repositories::login_attempt::LoginAttemptRepository {
        repositories::login_attempt::LoginAttemptRepository::new(self.conn.clone())
    }

    fn location_repo(&self) -> repositories::location::LocationRepository {
        repositories::location::LocationRepository::new(self.conn.clone())
    }

    fn visit_repo(&self) -> repositories::visit::VisitRepository {
        repositories::visit::VisitRepository::new(self.conn.clone())
    }

    fn favorite_repo(&self) -> repositories::favorite::FavoriteRepository {
        repositories::favorite::FavoriteRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool> {
        self.user_repo().username_taken(username).await
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool> {
        self.user_repo().email_taken(email).await
    }

    pub async fn create_user_with_verification(
        &self,
        new_user: NewUser,
        token_hash: &str,
        token_expires_at: DateTime<Utc>,
    ) -> Result<Option<User>> {
        self.user_repo()
            .create_with_verification(new_user, token_hash, token_expires_at)
            .await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn record_user_login(&self, user_id: i32) -> Result<()> {
        self.user_repo().record_login(user_id).await
    }

    pub async fn update_user_names(
        &self,
        user_id: i32,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<Option<User>> {
        self.user_repo()
            .update_names(user_id, first_name, last_name)
            .await
    }

    // One-time tokens

    pub async fn issue_one_time_token(
        &self,
        purpose: TokenPurpose,
        user_id: i32,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        ip_address: Option<String>,
    ) -> Result<()> {
        self.token_repo()
            .issue(purpose, user_id, token_hash, expires_at, ip_address)
            .await
    }

    pub async fn find_one_time_token(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
    ) -> Result<Option<OneTimeToken>> {
        self.token_repo().find_by_hash(purpose, token_hash).await
    }

    pub async fn redeem_verification_token(&self, token: &OneTimeToken) -> Result<bool> {
        self.token_repo().redeem_verification(token).await
    }

    pub async fn redeem_password_reset_token(
        &self,
        token: &OneTimeToken,
        new_password_hash: String,
    ) -> Result<bool> {
        self.token_repo()
            .redeem_password_reset(token, new_password_hash)
            .await
    }

    // Sessions and blacklist

    pub async fn create_session(&self, session: NewSession) -> Result<UserSession> {
        self.session_repo().create(session).await
    }

    pub async fn get_session_by_jti(&self, jti: &str) -> Result<Option<UserSession>> {
        self.session_repo().find_by_jti(jti).await
    }

    pub async fn list_active_sessions(&self, user_id: i32) -> Result<Vec<UserSession>> {
        self.session_repo().list_active(user_id).await
    }

    pub async fn rotate_session(
        &self,
        old_jti: &str,
        new_jti: String,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<UserSession>> {
        self.session_repo()
            .rotate(old_jti, new_jti, new_expires_at)
            .await
    }

    pub async fn revoke_session_by_jti(&self, user_id: i32, jti: &str) -> Result<bool> {
        self.session_repo().revoke_by_jti(user_id, jti).await
    }

    pub async fn revoke_all_sessions(&self, user_id: i32) -> Result<u64> {
        self.session_repo().revoke_all(user_id).await
    }

    pub async fn is_token_blacklisted(&self, jti: &str) -> Result<bool> {
        self.blacklist_repo().contains(jti).await
    }

    pub async fn blacklist_token(
        &self,
        jti: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.blacklist_repo().add(jti, user_id, expires_at).await
    }

    // Login throttling

    pub async fn get_login_attempt(&self, identifier: &str) -> Result<Option<LoginAttempt>> {
        self.login_attempt_repo().get(identifier).await
    }

    pub async fn record_login_failure(&self, identifier: &str, now: DateTime<Utc>) -> Result<i32> {
        self.login_attempt_repo()
            .record_failure(identifier, now)
            .await
    }

    pub async fn lock_login(
        &self,
        identifier: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.login_attempt_repo()
            .lock_until(identifier, until, now)
            .await
    }

    pub async fn reset_login_attempts(&self, identifier: &str) -> Result<()> {
        self.login_attempt_repo().reset(identifier).await
    }

    // Locations and moods

    pub async fn list_moods(&self) -> Result<Vec<Mood>> {
        self.location_repo().list_active_moods().await
    }

    pub async fn get_mood(&self, id: i32) -> Result<Option<Mood>> {
        self.location_repo().get_active_mood(id).await
    }

    pub async fn upsert_mood(&self, name: &str, slug: &str) -> Result<Mood> {
        self.location_repo().upsert_mood(name, slug).await
    }

    pub async fn list_approved_locations(
        &self,
        mood_slug: Option<&str>,
    ) -> Result<Vec<LocationWithMoods>> {
        self.location_repo().list_approved(mood_slug).await
    }

    pub async fn get_location(&self, id: i32) -> Result<Option<Location>> {
        self.location_repo().get(id).await
    }

    pub async fn get_approved_location(&self, id: i32) -> Result<Option<LocationWithMoods>> {
        self.location_repo().get_approved(id).await
    }

    pub async fn find_approved_location_by_qr(&self, qr_code: &str) -> Result<Option<Location>> {
        self.location_repo().find_approved_by_qr(qr_code).await
    }

    pub async fn location_mood_ids(&self, location_id: i32) -> Result<HashSet<i32>> {
        self.location_repo().mood_ids_for_location(location_id).await
    }

    pub async fn visited_mood_ids(&self, user_id: i32) -> Result<HashSet<i32>> {
        self.location_repo().visited_mood_ids(user_id).await
    }

    pub async fn attach_moods(&self, rows: Vec<Location>) -> Result<Vec<LocationWithMoods>> {
        self.location_repo().attach_moods(rows).await
    }

    pub async fn create_location_if_missing(&self, new: NewLocation) -> Result<Option<Location>> {
        self.location_repo().create_if_missing(new).await
    }

    // Visits, collectibles and reviews

    pub async fn check_in(&self, user_id: i32, location_id: i32) -> Result<CheckIn> {
        self.visit_repo().check_in(user_id, location_id).await
    }

    pub async fn get_visit(&self, id: i32) -> Result<Option<Visit>> {
        self.visit_repo().get(id).await
    }

    pub async fn visit_has_review(&self, visit_id: i32) -> Result<bool> {
        self.visit_repo().has_review(visit_id).await
    }

    pub async fn check_out(&self, visit: &Visit, review: NewReview) -> Result<Option<i32>> {
        self.visit_repo().check_out(visit, review).await
    }

    pub async fn list_visits(&self, user_id: i32) -> Result<Vec<(Visit, Location)>> {
        self.visit_repo().list_for_user(user_id).await
    }

    pub async fn list_collectibles(&self, user_id: i32) -> Result<Vec<(Collectible, Location)>> {
        self.visit_repo().list_collectibles(user_id).await
    }

    pub async fn count_collectibles(&self, user_id: i32, location_id: i32) -> Result<u64> {
        self.visit_repo()
            .count_collectibles(user_id, location_id)
            .await
    }

    // Favorites

    pub async fn toggle_favorite(&self, user_id: i32, location_id: i32) -> Result<bool> {
        self.favorite_repo().toggle(user_id, location_id).await
    }

    pub async fn remove_favorite(&self, user_id: i32, location_id: i32) -> Result<bool> {
        self.favorite_repo().remove(user_id, location_id).await
    }

    pub async fn list_favorites(
        &self,
        user_id: i32,
    ) -> Result<Vec<(repositories::favorite::Favorite, Location)>> {
        self.favorite_repo().list_for_user(user_id).await
    }

    // Maintenance

    /// Deletes expired blacklist rows, one-time tokens, sessions and idle
    /// login counters older than `cutoff`.
    pub async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<PurgeReport> {
        let now = Utc::now();
        Ok(PurgeReport {
            blacklisted_tokens: self.blacklist_repo().purge_expired(cutoff).await?,
            one_time_tokens: self.token_repo().purge(cutoff).await?,
            sessions: self.session_repo().purge_stale(cutoff).await?,
            login_attempts: self.login_attempt_repo().purge_stale(cutoff, now).await?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub blacklisted_tokens: u64,
    pub one_time_tokens: u64,
    pub sessions: u64,
    pub login_attempts: u64,
}

impl PurgeReport {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.blacklisted_tokens + self.one_time_tokens + self.sessions + self.login_attempts
    }
}
