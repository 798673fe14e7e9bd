pub mod favorite;
pub mod location;
pub mod login_attempt;
pub mod one_time_token;
pub mod session;
pub mod token_blacklist;
pub mod user;
pub mod visit;
