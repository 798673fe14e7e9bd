use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::{AuthService, LocationService};
use crate::state::SharedState;

mod account;
pub mod auth;
mod error;
mod extract;
mod favorites;
mod locations;
mod observability;
mod types;
mod validation;
mod visits;

pub use error::ApiError;
pub use observability::REQUEST_ID_HEADER;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn location_service(&self) -> &Arc<dyn LocationService> {
        &self.shared.location_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        prometheus_handle,
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(create_protected_router(state.clone()))
        .merge(create_optional_auth_router(state.clone()))
        .route("/auth/ping", get(account::ping))
        .route("/auth/register", post(account::register))
        .route("/auth/verify-email", post(account::verify_email))
        .route(
            "/auth/resend-verification",
            post(account::resend_verification),
        )
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route(
            "/auth/password-reset/request",
            post(account::password_reset_request),
        )
        .route(
            "/auth/password-reset/confirm",
            post(account::password_reset_confirm),
        )
        .route("/moods", get(locations::list_moods))
        .route("/moods/{id}", get(locations::get_mood))
        .route("/locations", get(locations::list_locations));

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api/v1", api_router)
        .route("/metrics", get(observability::get_metrics))
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

/// Routes that answer anonymous callers but personalise for signed-in ones.
fn create_optional_auth_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/locations/{id}", get(locations::get_location))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::optional_auth_middleware,
        ))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout-all", post(auth::logout_all))
        .route("/auth/me", get(account::get_me).patch(account::update_me))
        .route("/auth/sessions", get(account::list_sessions))
        .route("/auth/sessions/{jti}", delete(account::revoke_session))
        .route("/locations/{id}/vibe-match", get(locations::vibe_match))
        .route("/visits/checkin", post(visits::check_in))
        .route("/visits/{id}/checkout", post(visits::check_out))
        .route("/visits/me", get(visits::my_visits))
        .route("/me/collectibles", get(visits::my_collectibles))
        .route("/favorites", post(favorites::toggle_favorite))
        .route("/favorites/me", get(favorites::my_favorites))
        .route(
            "/favorites/{location_id}",
            delete(favorites::remove_favorite),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
