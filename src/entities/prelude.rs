pub use super::collectibles::Entity as Collectibles;
pub use super::email_verification_tokens::Entity as EmailVerificationTokens;
pub use super::favorites::Entity as Favorites;
pub use super::location_moods::Entity as LocationMoods;
pub use super::locations::Entity as Locations;
pub use super::login_attempts::Entity as LoginAttempts;
pub use super::moods::Entity as Moods;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::promotions::Entity as Promotions;
pub use super::reviews::Entity as Reviews;
pub use super::token_blacklist::Entity as TokenBlacklist;
pub use super::user_sessions::Entity as UserSessions;
pub use super::users::Entity as Users;
pub use super::visits::Entity as Visits;
