pub mod auth_service;
pub use auth_service::{AuthError, AuthService};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod location_service;
pub use location_service::{LocationError, LocationService};

pub mod location_service_impl;
pub use location_service_impl::SeaOrmLocationService;

pub mod mailer;
pub use mailer::{Mailer, MemoryMailer};

pub mod one_time_token;

pub mod rate_limiter;
pub use rate_limiter::{LoginRateLimiter, RateDecision};

pub mod token_issuer;
pub use token_issuer::TokenIssuer;

pub mod vibe_match;
