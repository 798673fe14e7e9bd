pub mod prelude;

pub mod collectibles;
pub mod email_verification_tokens;
pub mod favorites;
pub mod location_moods;
pub mod locations;
pub mod login_attempts;
pub mod moods;
pub mod password_reset_tokens;
pub mod promotions;
pub mod reviews;
pub mod token_blacklist;
pub mod user_sessions;
pub mod users;
pub mod visits;
