use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::{AuthUser, ClientMeta};
use super::validation::{
    require_non_blank, validate_email, validate_password, validate_username,
};
use super::extract::{ApiJson, ApiPath};
use super::{ApiError, ApiResponse, AppState, EmailRequest, MessageResponse, TokenRequest};
use crate::constants::messages;
use crate::services::auth_service::{Registration, SessionInfo, UserProfile};

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
    pub email_sent: bool,
}

#[derive(Serialize)]
pub struct VerifyEmailResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordResetConfirmRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub service: &'static str,
}

/// GET /auth/ping
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        ok: true,
        service: "accounts",
    })
}

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = validate_username(&payload.username)?;
    let email = validate_email(&payload.email)?;
    validate_password(&payload.password, &username, &email)?;

    let registration = Registration {
        username,
        email,
        password: payload.password,
        first_name: payload.first_name.unwrap_or_default().trim().to_string(),
        last_name: payload.last_name.unwrap_or_default().trim().to_string(),
    };

    let result = state.auth_service().register(registration).await?;

    let message = if result.email_sent {
        "Registration successful. Check your email to verify your account."
    } else {
        "Registration successful, but the verification email could not be sent. Request a new one."
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisterResponse {
            message: message.to_string(),
            user: result.user,
            email_sent: result.email_sent,
        })),
    ))
}

/// POST /auth/verify-email
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<TokenRequest>,
) -> Result<Json<ApiResponse<VerifyEmailResponse>>, ApiError> {
    let token = require_non_blank("token", &payload.token)?;
    let user = state.auth_service().verify_email(token.trim()).await?;

    Ok(Json(ApiResponse::success(VerifyEmailResponse {
        message: "Email verified successfully. You can now log in.".to_string(),
        user,
    })))
}

/// POST /auth/resend-verification
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<EmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validate_email(&payload.email)?;
    state.auth_service().resend_verification(&email).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        messages::RESEND_VERIFICATION,
    ))))
}

/// GET /auth/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state.auth_service().get_profile(user.id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// PATCH /auth/me
/// Only the first and last name are editable.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state
        .auth_service()
        .update_profile(
            user.id,
            payload.first_name.map(|s| s.trim().to_string()),
            payload.last_name.map(|s| s.trim().to_string()),
        )
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// POST /auth/password-reset/request
/// Answers the same way whether or not the email belongs to an account.
pub async fn password_reset_request(
    State(state): State<Arc<AppState>>,
    client: ClientMeta,
    ApiJson(payload): ApiJson<EmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validate_email(&payload.email)?;
    state
        .auth_service()
        .request_password_reset(&email, client.ip_address)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        messages::PASSWORD_RESET_REQUESTED,
    ))))
}

/// POST /auth/password-reset/confirm
pub async fn password_reset_confirm(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<PasswordResetConfirmRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let token = require_non_blank("token", &payload.token)?;
    validate_password(&payload.new_password, "", "")?;

    state
        .auth_service()
        .confirm_password_reset(token.trim(), &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password has been reset. Log in with your new password.",
    ))))
}

/// GET /auth/sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<SessionInfo>>>, ApiError> {
    let sessions = state
        .auth_service()
        .list_sessions(user.id, Some(&user.session_jti))
        .await?;
    Ok(Json(ApiResponse::success(sessions)))
}

/// DELETE /auth/sessions/{jti}
pub async fn revoke_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(jti): ApiPath<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.auth_service().revoke_session(user.id, &jti).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Session revoked",
    ))))
}
