use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use super::extract::ApiJson;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::constants::limits::{MAX_DEVICE_NAME_LEN, MAX_USER_AGENT_LEN};
use crate::db::DeviceInfo;
use crate::services::auth_service::{AuthenticatedUser, LoginResult, TokenPair};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub device_name: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

#[derive(Serialize)]
pub struct LogoutAllResponse {
    pub message: String,
    pub revoked: u64,
}

// ============================================================================
// Extractors
// ============================================================================

/// The caller resolved by [`auth_middleware`].
pub struct AuthUser(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Self)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// The caller if [`optional_auth_middleware`] could resolve one.
pub struct OptionalUser(pub Option<AuthenticatedUser>);

impl<S: Send + Sync> FromRequestParts<S> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

/// Client address and user agent recorded with sessions and reset requests.
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: String,
}

impl FromRequestParts<Arc<AppState>> for ClientMeta {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let forwarded = if state.config().server.trust_forwarded_for {
            forwarded_for(&parts.headers)
        } else {
            None
        };

        let ip_address = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(|ua| truncate(ua, MAX_USER_AGENT_LEN))
            .unwrap_or_default();

        Ok(Self {
            ip_address,
            user_agent,
        })
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(ToString::to_string)
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

// ============================================================================
// Middleware
// ============================================================================

/// Extract the token from `Authorization: Bearer <token>`.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Rejects requests without a valid access token; attaches the caller otherwise.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(request.headers()) else {
        return ApiError::unauthorized().into_response();
    };

    match state.auth_service().authenticate(token).await {
        Ok(user) => {
            tracing::Span::current().record("user_id", user.id);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Attaches the caller when a valid access token is present. Anything else
/// continues as an anonymous request.
pub async fn optional_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_bearer(request.headers()).map(ToString::to_string);

    if let Some(token) = token
        && let Ok(user) = state.auth_service().authenticate(&token).await
    {
        tracing::Span::current().record("user_id", user.id);
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientMeta,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation(
            "Username and password are required",
        ));
    }

    let device = DeviceInfo {
        device_name: truncate(payload.device_name.trim(), MAX_DEVICE_NAME_LEN),
        user_agent: client.user_agent,
        ip_address: client.ip_address,
    };

    let result = state
        .auth_service()
        .login(payload.username.trim(), &payload.password, device)
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    if payload.refresh.trim().is_empty() {
        return Err(ApiError::validation("Refresh token is required"));
    }

    let pair = state.auth_service().refresh(payload.refresh.trim()).await?;
    Ok(Json(ApiResponse::success(pair)))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.refresh.trim().is_empty() {
        return Err(ApiError::validation("Refresh token is required"));
    }

    state
        .auth_service()
        .logout(user.id, payload.refresh.trim())
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Logged out successfully",
    ))))
}

/// POST /auth/logout-all
pub async fn logout_all(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state.auth_service().logout_all(user.id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(LogoutAllResponse {
            message: "All sessions have been closed".to_string(),
            revoked,
        })),
    ))
}
